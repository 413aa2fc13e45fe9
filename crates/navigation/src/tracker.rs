//! Continuous distance and bearing to a fixed target.
//!
//! A [`LocationTracker`] owns at most one position watch. Every sample the
//! provider delivers is turned into a [`NavigationResult`] against the
//! current target and handed to the update callback.
//!
//! # Example
//!
//! ```
//! use velo_geo::Coordinate;
//! use velo_navigation::{LocationTracker, PositionFeed};
//!
//! let feed = PositionFeed::new();
//! let mut tracker = LocationTracker::new(feed.clone());
//!
//! tracker.start(
//!     Coordinate::new(51.2294, 4.4125),
//!     |result| println!("{:.2} km at {:.0}°", result.distance_km, result.bearing_degrees),
//!     |err| eprintln!("tracking failed: {err}"),
//! );
//!
//! feed.push(Coordinate::new(51.2194, 4.4025));
//! assert_eq!(tracker.dispatch_pending(), 1);
//! ```

use crate::error::LocationErrorKind;
use crate::provider::{PositionEvent, PositionProvider, WatchOptions};
use crate::subscription::{Envelope, Inbox, Subscription, SubscriptionId};
use serde::Serialize;
use tracing::{debug, trace, warn};
use velo_geo::{Coordinate, NavigationResult};

/// Callback receiving each recomputed result.
pub type UpdateCallback = Box<dyn FnMut(NavigationResult) + Send>;

/// Callback receiving the reason tracking stopped.
pub type ErrorCallback = Box<dyn FnMut(LocationErrorKind) + Send>;

/// Lifecycle of a [`LocationTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum TrackerState {
    /// No watch is active
    Idle,
    /// A watch is active and samples are being delivered
    Watching,
    /// The last watch failed; call `start` again to retry
    Failed(LocationErrorKind),
}

struct ActiveWatch {
    subscription: Subscription,
    target: Coordinate,
    on_update: UpdateCallback,
    on_error: ErrorCallback,
}

/// Tracks the user's position against one target at a time.
pub struct LocationTracker<P: PositionProvider> {
    provider: P,
    options: WatchOptions,
    inbox: Inbox<PositionEvent>,
    active: Option<ActiveWatch>,
    state: TrackerState,
    latest: Option<NavigationResult>,
}

impl<P: PositionProvider> LocationTracker<P> {
    /// Creates an idle tracker with default watch options.
    pub fn new(provider: P) -> Self {
        Self::with_options(provider, WatchOptions::default())
    }

    /// Creates an idle tracker with explicit watch options.
    pub fn with_options(provider: P, options: WatchOptions) -> Self {
        Self {
            provider,
            options,
            inbox: Inbox::new(),
            active: None,
            state: TrackerState::Idle,
            latest: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Most recent result for the current target, if any sample has arrived.
    pub fn latest(&self) -> Option<NavigationResult> {
        self.latest
    }

    /// Target of the live watch.
    pub fn target(&self) -> Option<Coordinate> {
        self.active.as_ref().map(|a| a.target)
    }

    /// Id of the live watch.
    pub fn watch_id(&self) -> Option<SubscriptionId> {
        self.active.as_ref().map(|a| a.subscription.id())
    }

    /// Options used for new watches.
    pub fn options(&self) -> &WatchOptions {
        &self.options
    }

    /// Access the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Starts tracking `target`.
    ///
    /// A watch that is already running is cleared first, so switching to
    /// another station never leaves two watches alive. If the provider
    /// refuses to start, the tracker moves to [`TrackerState::Failed`] and
    /// `on_error` is called before this returns.
    pub fn start<U, E>(&mut self, target: Coordinate, on_update: U, on_error: E)
    where
        U: FnMut(NavigationResult) + Send + 'static,
        E: FnMut(LocationErrorKind) + Send + 'static,
    {
        self.stop();

        let (subscription, sink) = self.inbox.open();
        let watch = subscription.id();
        let mut on_error: ErrorCallback = Box::new(on_error);

        match self.provider.watch(&self.options, sink) {
            Ok(()) => {
                debug!(watch = %watch, target = %target, "Position watch started");
                self.active = Some(ActiveWatch {
                    subscription,
                    target,
                    on_update: Box::new(on_update),
                    on_error,
                });
                self.state = TrackerState::Watching;
            }
            Err(kind) => {
                subscription.cancel();
                warn!(watch = %watch, error = %kind, "Position watch could not start");
                self.state = TrackerState::Failed(kind);
                on_error(kind);
            }
        }
    }

    /// Stops tracking. Safe to call in any state.
    ///
    /// Samples still queued for the old watch are dropped, so no callback
    /// runs after this returns.
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            self.release(&active.subscription);
            debug!(watch = %active.subscription.id(), "Position watch stopped");
        }
        self.state = TrackerState::Idle;
        self.latest = None;
    }

    /// Dispatches every queued event without waiting.
    ///
    /// Returns how many reached a callback.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut delivered = 0;
        while let Some(envelope) = self.inbox.try_next() {
            if self.dispatch(envelope) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Waits for the next event and dispatches it.
    ///
    /// Returns whether it reached a callback; stale events return false.
    /// Never resolves while no provider is producing events.
    pub async fn next(&mut self) -> bool {
        match self.inbox.next().await {
            Some(envelope) => self.dispatch(envelope),
            None => false,
        }
    }

    fn dispatch(&mut self, envelope: Envelope<PositionEvent>) -> bool {
        let Envelope { id, event } = envelope;

        let Some(active) = self.active.as_mut().filter(|a| a.subscription.id() == id) else {
            trace!(watch = %id, "Discarding stale position event");
            return false;
        };

        match event {
            PositionEvent::Sample(sample) => {
                let result = NavigationResult::between(&sample.coordinate, &active.target);
                trace!(
                    watch = %id,
                    distance_km = result.distance_km,
                    bearing = result.bearing_degrees,
                    "Position update"
                );
                self.latest = Some(result);
                (active.on_update)(result);
            }
            PositionEvent::Failed(kind) => {
                let Some(mut failed) = self.active.take() else {
                    return false;
                };
                self.release(&failed.subscription);
                warn!(watch = %id, error = %kind, "Position watch failed");
                self.state = TrackerState::Failed(kind);
                self.latest = None;
                (failed.on_error)(kind);
            }
        }
        true
    }

    fn release(&mut self, subscription: &Subscription) {
        subscription.cancel();
        self.provider.clear_watch(subscription.id());
    }
}

impl<P: PositionProvider> Drop for LocationTracker<P> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::PositionFeed;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    const GROENPLAATS: Coordinate = Coordinate::new(51.2194, 4.4025);
    const STATION: Coordinate = Coordinate::new(51.2294, 4.4125);
    const OTHER_STATION: Coordinate = Coordinate::new(51.2172, 4.4211);

    #[derive(Clone, Default)]
    struct Recorder {
        updates: Arc<Mutex<Vec<NavigationResult>>>,
        errors: Arc<Mutex<Vec<LocationErrorKind>>>,
    }

    impl Recorder {
        fn start<P: PositionProvider>(&self, tracker: &mut LocationTracker<P>, target: Coordinate) {
            let updates = Arc::clone(&self.updates);
            let errors = Arc::clone(&self.errors);
            tracker.start(
                target,
                move |r| updates.lock().unwrap().push(r),
                move |e| errors.lock().unwrap().push(e),
            );
        }

        fn updates(&self) -> Vec<NavigationResult> {
            self.updates.lock().unwrap().clone()
        }

        fn errors(&self) -> Vec<LocationErrorKind> {
            self.errors.lock().unwrap().clone()
        }
    }

    #[test]
    fn test_start_and_receive_updates() {
        let feed = PositionFeed::new();
        let mut tracker = LocationTracker::new(feed.clone());
        let recorder = Recorder::default();

        assert_eq!(tracker.state(), TrackerState::Idle);
        recorder.start(&mut tracker, STATION);
        assert_eq!(tracker.state(), TrackerState::Watching);
        assert_eq!(tracker.target(), Some(STATION));

        feed.push(GROENPLAATS);
        assert_eq!(tracker.dispatch_pending(), 1);

        let updates = recorder.updates();
        assert_eq!(updates.len(), 1);
        assert!((updates[0].distance_km - 1.31).abs() < 0.05);
        assert_eq!(tracker.latest(), Some(updates[0]));
    }

    #[test]
    fn test_watch_uses_fresh_high_accuracy_options() {
        let feed = PositionFeed::new();
        let options = WatchOptions::default().with_timeout(Duration::from_secs(5));
        let mut tracker = LocationTracker::with_options(feed.clone(), options);

        Recorder::default().start(&mut tracker, STATION);

        let used = feed.last_options().unwrap();
        assert!(used.enable_high_accuracy);
        assert_eq!(used.maximum_age, Duration::ZERO);
        assert_eq!(used.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_restart_leaves_single_watch() {
        let feed = PositionFeed::new();
        let mut tracker = LocationTracker::new(feed.clone());
        let recorder = Recorder::default();

        recorder.start(&mut tracker, STATION);
        recorder.start(&mut tracker, OTHER_STATION);

        assert_eq!(feed.active_watches(), 1);
        assert_eq!(feed.watch_calls(), 2);
        assert_eq!(feed.cleared_watches(), 1);

        feed.push(GROENPLAATS);
        assert_eq!(tracker.dispatch_pending(), 1);
        assert_eq!(recorder.updates().len(), 1);

        // Measured against the new target only
        let expected = NavigationResult::between(&GROENPLAATS, &OTHER_STATION);
        assert_eq!(recorder.updates()[0], expected);
    }

    #[test]
    fn test_restart_drops_samples_queued_for_old_target() {
        let feed = PositionFeed::new();
        let mut tracker = LocationTracker::new(feed.clone());
        let recorder = Recorder::default();

        recorder.start(&mut tracker, STATION);
        feed.push(GROENPLAATS);
        recorder.start(&mut tracker, OTHER_STATION);

        assert_eq!(tracker.dispatch_pending(), 0);
        assert!(recorder.updates().is_empty());
    }

    #[test]
    fn test_no_delivery_after_stop() {
        let feed = PositionFeed::new();
        let mut tracker = LocationTracker::new(feed.clone());
        let recorder = Recorder::default();

        recorder.start(&mut tracker, STATION);
        let stale_sink = feed.sinks().pop().unwrap();

        // In flight before stop
        feed.push(GROENPLAATS);
        feed.push_error(LocationErrorKind::Timeout);
        tracker.stop();

        // Late delivery from a provider that ignored the clear
        assert!(!stale_sink.send_sample(crate::PositionSample::now(GROENPLAATS)));

        assert_eq!(tracker.dispatch_pending(), 0);
        assert!(recorder.updates().is_empty());
        assert!(recorder.errors().is_empty());
        assert_eq!(tracker.state(), TrackerState::Idle);
        assert_eq!(feed.active_watches(), 0);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let feed = PositionFeed::new();
        let mut tracker = LocationTracker::new(feed.clone());

        tracker.stop();
        Recorder::default().start(&mut tracker, STATION);
        tracker.stop();
        tracker.stop();

        assert_eq!(tracker.state(), TrackerState::Idle);
        assert_eq!(feed.cleared_watches(), 1);
        assert!(tracker.latest().is_none());
    }

    #[test]
    fn test_provider_error_fails_without_retry() {
        let feed = PositionFeed::new();
        let mut tracker = LocationTracker::new(feed.clone());
        let recorder = Recorder::default();

        recorder.start(&mut tracker, STATION);
        feed.push_error(LocationErrorKind::PositionUnavailable);
        feed.push(GROENPLAATS);

        // The error lands; the sample queued after it is stale.
        assert_eq!(tracker.dispatch_pending(), 1);
        assert_eq!(recorder.errors(), vec![LocationErrorKind::PositionUnavailable]);
        assert!(recorder.updates().is_empty());
        assert_eq!(tracker.state(), TrackerState::Failed(LocationErrorKind::PositionUnavailable));
        assert_eq!(feed.active_watches(), 0);
        assert_eq!(feed.watch_calls(), 1);
    }

    #[test]
    fn test_refused_watch_reports_error() {
        let feed = PositionFeed::new();
        feed.refuse_next_watch(LocationErrorKind::PermissionDenied);
        let mut tracker = LocationTracker::new(feed.clone());
        let recorder = Recorder::default();

        recorder.start(&mut tracker, STATION);

        assert_eq!(recorder.errors(), vec![LocationErrorKind::PermissionDenied]);
        assert_eq!(tracker.state(), TrackerState::Failed(LocationErrorKind::PermissionDenied));
        assert!(tracker.watch_id().is_none());

        // Caller-driven retry
        recorder.start(&mut tracker, STATION);
        assert_eq!(tracker.state(), TrackerState::Watching);
        feed.push(GROENPLAATS);
        assert_eq!(tracker.dispatch_pending(), 1);
    }

    #[test]
    fn test_drop_clears_watch() {
        let feed = PositionFeed::new();
        {
            let mut tracker = LocationTracker::new(feed.clone());
            Recorder::default().start(&mut tracker, STATION);
            assert_eq!(feed.active_watches(), 1);
        }
        assert_eq!(feed.active_watches(), 0);
    }

    #[test]
    fn test_next_awaits_delivery() {
        let feed = PositionFeed::new();
        let mut tracker = LocationTracker::new(feed.clone());
        let recorder = Recorder::default();
        recorder.start(&mut tracker, STATION);

        feed.push(GROENPLAATS);
        assert!(tokio_test::block_on(tracker.next()));
        assert_eq!(recorder.updates().len(), 1);
    }

    #[tokio::test]
    async fn test_samples_from_another_task() {
        let feed = PositionFeed::new();
        let mut tracker = LocationTracker::new(feed.clone());
        let recorder = Recorder::default();
        recorder.start(&mut tracker, STATION);

        let producer = feed.clone();
        tokio::spawn(async move {
            for step in 0..3 {
                let lat = 51.2194 + f64::from(step) * 0.003;
                producer.push(Coordinate::new(lat, 4.4025));
            }
        });

        for _ in 0..3 {
            assert!(tracker.next().await);
        }

        let distances: Vec<f64> = recorder.updates().iter().map(|r| r.distance_km).collect();
        assert_eq!(distances.len(), 3);
        assert!(distances.windows(2).all(|w| w[1] < w[0]));
    }
}
