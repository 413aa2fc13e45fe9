//! Push-driven providers.
//!
//! A feed is a provider whose samples come from the caller rather than a
//! device: a recorded track, lines on stdin, or a test. Clones share state,
//! so one clone can be handed to a tracker while another pushes samples.

use crate::error::{LocationErrorKind, NavigationError, Result};
use crate::provider::{
    OrientationProvider, OrientationReading, OrientationSink, PermissionResponse, PositionProvider,
    PositionSample, PositionSink, WatchOptions,
};
use crate::subscription::SubscriptionId;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use velo_geo::Coordinate;

#[derive(Default)]
struct PositionFeedState {
    sinks: Vec<PositionSink>,
    watch_calls: usize,
    cleared: usize,
    refuse_next: Option<LocationErrorKind>,
    last_options: Option<WatchOptions>,
}

/// A [`PositionProvider`] fed by hand.
#[derive(Clone, Default)]
pub struct PositionFeed {
    state: Arc<Mutex<PositionFeedState>>,
}

impl PositionFeed {
    /// An empty feed.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, PositionFeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delivers a fix captured now to every live watch.
    ///
    /// Returns the number of watches reached.
    pub fn push(&self, coordinate: Coordinate) -> usize {
        self.push_sample(PositionSample::now(coordinate))
    }

    /// Delivers a sample to every live watch.
    pub fn push_sample(&self, sample: PositionSample) -> usize {
        self.lock().sinks.iter().filter(|sink| sink.send_sample(sample)).count()
    }

    /// Delivers a failure to every live watch.
    pub fn push_error(&self, kind: LocationErrorKind) -> usize {
        self.lock().sinks.iter().filter(|sink| sink.send_error(kind)).count()
    }

    /// Makes the next `watch` call fail with `kind`.
    pub fn refuse_next_watch(&self, kind: LocationErrorKind) {
        self.lock().refuse_next = Some(kind);
    }

    /// Number of watches started and not yet cleared.
    pub fn active_watches(&self) -> usize {
        self.lock().sinks.len()
    }

    /// Total `watch` calls, including refused ones.
    pub fn watch_calls(&self) -> usize {
        self.lock().watch_calls
    }

    /// Total watches cleared.
    pub fn cleared_watches(&self) -> usize {
        self.lock().cleared
    }

    /// Options passed to the most recent `watch` call.
    pub fn last_options(&self) -> Option<WatchOptions> {
        self.lock().last_options
    }

    /// Sinks of the live watches.
    pub fn sinks(&self) -> Vec<PositionSink> {
        self.lock().sinks.clone()
    }
}

impl PositionProvider for PositionFeed {
    fn watch(&mut self, options: &WatchOptions, sink: PositionSink) -> std::result::Result<(), LocationErrorKind> {
        let mut state = self.lock();
        state.watch_calls += 1;
        state.last_options = Some(*options);

        if let Some(kind) = state.refuse_next.take() {
            return Err(kind);
        }
        state.sinks.push(sink);
        Ok(())
    }

    fn clear_watch(&mut self, watch: SubscriptionId) {
        let mut state = self.lock();
        let before = state.sinks.len();
        state.sinks.retain(|sink| sink.id() != watch);
        state.cleared += before - state.sinks.len();
    }
}

struct OrientationFeedState {
    response: Option<PermissionResponse>,
    prompt_error: Option<String>,
    prompts: usize,
    sinks: Vec<OrientationSink>,
    subscribe_calls: usize,
    unsubscribe_calls: usize,
}

/// An [`OrientationProvider`] fed by hand.
#[derive(Clone)]
pub struct OrientationFeed {
    state: Arc<Mutex<OrientationFeedState>>,
}

impl Default for OrientationFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl OrientationFeed {
    /// A sensor that needs no permission prompt.
    pub fn new() -> Self {
        Self::with_response(None)
    }

    /// A sensor behind a prompt that answers `response`.
    pub fn gated(response: PermissionResponse) -> Self {
        Self::with_response(Some(response))
    }

    fn with_response(response: Option<PermissionResponse>) -> Self {
        Self {
            state: Arc::new(Mutex::new(OrientationFeedState {
                response,
                prompt_error: None,
                prompts: 0,
                sinks: Vec::new(),
                subscribe_calls: 0,
                unsubscribe_calls: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, OrientationFeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Changes the answer of future prompts.
    pub fn set_response(&self, response: PermissionResponse) {
        self.lock().response = Some(response);
    }

    /// Makes future prompts fail.
    pub fn fail_prompt(&self, message: impl Into<String>) {
        self.lock().prompt_error = Some(message.into());
    }

    /// Delivers a reading to every live subscription.
    pub fn push(&self, reading: OrientationReading) -> usize {
        self.lock().sinks.iter().filter(|sink| sink.send(reading)).count()
    }

    /// Number of prompts shown.
    pub fn prompts(&self) -> usize {
        self.lock().prompts
    }

    /// Number of live subscriptions.
    pub fn active_subscriptions(&self) -> usize {
        self.lock().sinks.len()
    }

    /// Total `subscribe` calls.
    pub fn subscribe_calls(&self) -> usize {
        self.lock().subscribe_calls
    }

    /// Total `unsubscribe` calls.
    pub fn unsubscribe_calls(&self) -> usize {
        self.lock().unsubscribe_calls
    }
}

impl OrientationProvider for OrientationFeed {
    fn requires_permission(&self) -> bool {
        self.lock().response.is_some()
    }

    fn request_permission(&mut self) -> Result<PermissionResponse> {
        let mut state = self.lock();
        state.prompts += 1;

        if let Some(message) = &state.prompt_error {
            return Err(NavigationError::sensor(message.clone()));
        }
        Ok(state.response.unwrap_or(PermissionResponse::Granted))
    }

    fn subscribe(&mut self, sink: OrientationSink) -> Result<()> {
        let mut state = self.lock();
        state.subscribe_calls += 1;
        state.sinks.push(sink);
        Ok(())
    }

    fn unsubscribe(&mut self, subscription: SubscriptionId) {
        let mut state = self.lock();
        state.unsubscribe_calls += 1;
        state.sinks.retain(|sink| sink.id() != subscription);
    }
}
