//! Device heading and pointer rotation.
//!
//! [`CompassFuser`] owns the permission state machine and the orientation
//! subscription, normalises raw readings into a heading and combines that
//! heading with a target bearing. [`CompassService`] shares one fuser across
//! every view that needs it and keeps the sensor subscribed only while at
//! least one [`CompassLease`] is alive.

use crate::provider::{OrientationProvider, OrientationReading, PermissionResponse};
use crate::subscription::{Envelope, Inbox, Subscription};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace, warn};
use velo_geo::normalize_degrees;

/// Where a heading came from, resolved once per reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformConvention {
    /// Platform reports a native compass heading
    CompassHeading,
    /// Platform reports raw z-axis rotation that needs inverting and offsetting
    RawRotation,
}

/// A normalised heading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientationSample {
    /// Heading in `[0, 360)`
    pub heading_degrees: f64,
    /// Convention of the reading it was derived from
    pub source: PlatformConvention,
}

impl OrientationSample {
    /// Applies the platform's sign convention to a raw reading.
    ///
    /// Both conventions are negated before use; raw rotation is first
    /// offset from 360. Non-finite readings yield `None`.
    pub fn from_reading(reading: OrientationReading) -> Option<Self> {
        if !reading.degrees().is_finite() {
            return None;
        }

        let (heading, source) = match reading {
            OrientationReading::CompassHeading(value) => (-value, PlatformConvention::CompassHeading),
            OrientationReading::Alpha(alpha) => (-(360.0 - alpha), PlatformConvention::RawRotation),
        };

        Some(Self {
            heading_degrees: normalize_degrees(heading),
            source,
        })
    }

    /// Pointer rotation for `bearing` given this heading.
    #[inline]
    pub fn rotate(&self, bearing: f64) -> f64 {
        normalize_degrees(self.heading_degrees + bearing)
    }
}

/// Orientation permission lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    /// Not asked yet
    #[default]
    Unrequested,
    /// Platform prompt in progress
    Requesting,
    /// Readings may be subscribed
    Granted,
    /// Refused; never asked again this session
    Denied,
}

impl PermissionState {
    /// Granted or Denied.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Granted | Self::Denied)
    }
}

impl fmt::Display for PermissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unrequested => "unrequested",
            Self::Requesting => "requesting",
            Self::Granted => "granted",
            Self::Denied => "denied",
        };
        f.write_str(label)
    }
}

/// Permission gate, subscription and latest heading for one orientation sensor.
pub struct CompassFuser<O: OrientationProvider> {
    provider: O,
    permission: PermissionState,
    inbox: Inbox<OrientationReading>,
    subscription: Option<Subscription>,
    latest: Option<OrientationSample>,
}

impl<O: OrientationProvider> CompassFuser<O> {
    /// Creates a fuser that has not asked for permission yet.
    pub fn new(provider: O) -> Self {
        Self {
            provider,
            permission: PermissionState::Unrequested,
            inbox: Inbox::new(),
            subscription: None,
            latest: None,
        }
    }

    /// Current permission state.
    pub fn permission(&self) -> PermissionState {
        self.permission
    }

    /// True while subscribed to the sensor.
    pub fn is_active(&self) -> bool {
        self.subscription.is_some()
    }

    /// Latest normalised sample.
    pub fn latest(&self) -> Option<OrientationSample> {
        self.latest
    }

    /// Latest heading in degrees.
    pub fn heading(&self) -> Option<f64> {
        self.latest.map(|s| s.heading_degrees)
    }

    /// Access the underlying provider.
    pub fn provider(&self) -> &O {
        &self.provider
    }

    /// Asks for orientation access. Call from a user gesture.
    ///
    /// Platforms without a prompt resolve to Granted immediately. Once the
    /// state is Granted or Denied the stored state is returned and the
    /// platform is not asked again. Becoming Granted subscribes to readings;
    /// later calls leave the subscription alone, use [`activate`](Self::activate)
    /// to re-arm after [`deactivate`](Self::deactivate).
    pub fn request_permission(&mut self) -> PermissionState {
        let previous = self.permission;
        let permission = self.resolve_permission();
        if permission == PermissionState::Granted && previous != PermissionState::Granted {
            self.activate();
        }
        permission
    }

    /// Settles the permission state without touching the subscription.
    pub(crate) fn resolve_permission(&mut self) -> PermissionState {
        if self.permission.is_settled() || self.permission == PermissionState::Requesting {
            return self.permission;
        }

        let resolved = if self.provider.requires_permission() {
            self.permission = PermissionState::Requesting;
            match self.provider.request_permission() {
                Ok(PermissionResponse::Granted) => PermissionState::Granted,
                Ok(PermissionResponse::Denied) => PermissionState::Denied,
                Err(e) => {
                    warn!(error = %e, "Orientation permission request failed");
                    PermissionState::Denied
                }
            }
        } else {
            PermissionState::Granted
        };

        self.permission = resolved;
        debug!(permission = %resolved, "Orientation permission resolved");
        resolved
    }

    /// Subscribes to readings if permission is Granted.
    ///
    /// Does nothing when already subscribed. Returns whether a subscription
    /// is live afterwards.
    pub fn activate(&mut self) -> bool {
        if self.subscription.is_some() {
            return true;
        }
        if self.permission != PermissionState::Granted {
            return false;
        }

        let (subscription, sink) = self.inbox.open();
        match self.provider.subscribe(sink) {
            Ok(()) => {
                debug!(subscription = %subscription.id(), "Orientation subscription started");
                self.subscription = Some(subscription);
                true
            }
            Err(e) => {
                subscription.cancel();
                warn!(error = %e, "Orientation subscription failed");
                false
            }
        }
    }

    /// Unsubscribes and forgets the last heading. Idempotent.
    pub fn deactivate(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
            self.provider.unsubscribe(subscription.id());
            debug!(subscription = %subscription.id(), "Orientation subscription stopped");
        }
        self.latest = None;
    }

    /// Applies every queued reading; the last finite one wins.
    ///
    /// Returns how many readings were applied.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Some(envelope) = self.inbox.try_next() {
            if self.apply(envelope) {
                applied += 1;
            }
        }
        applied
    }

    /// Waits for the next reading and applies it.
    pub async fn next(&mut self) -> bool {
        match self.inbox.next().await {
            Some(envelope) => self.apply(envelope),
            None => false,
        }
    }

    /// Pointer rotation for `bearing`.
    ///
    /// With a heading: `(heading + bearing) mod 360`. Without one the
    /// bearing is returned unchanged.
    pub fn fused_rotation(&self, bearing: f64) -> f64 {
        match self.latest {
            Some(sample) => sample.rotate(bearing),
            None => bearing,
        }
    }

    fn apply(&mut self, envelope: Envelope<OrientationReading>) -> bool {
        let live = self.subscription.as_ref().is_some_and(|s| s.id() == envelope.id);
        if !live {
            trace!(subscription = %envelope.id, "Discarding stale orientation reading");
            return false;
        }

        let Some(sample) = OrientationSample::from_reading(envelope.event) else {
            trace!(reading = ?envelope.event, "Ignoring non-finite orientation reading");
            return false;
        };
        trace!(heading = sample.heading_degrees, source = ?sample.source, "Heading update");
        self.latest = Some(sample);
        true
    }
}

impl<O: OrientationProvider> Drop for CompassFuser<O> {
    fn drop(&mut self) {
        self.deactivate();
    }
}

struct ServiceState<O: OrientationProvider> {
    fuser: CompassFuser<O>,
    leases: usize,
}

impl<O: OrientationProvider> ServiceState<O> {
    /// Subscribed exactly when permission is Granted and a lease is held.
    fn reconcile(&mut self) {
        if self.leases > 0 {
            self.fuser.activate();
        } else {
            self.fuser.deactivate();
        }
    }
}

/// Process-wide compass shared by every view.
///
/// Cloning is cheap and yields another handle to the same sensor.
pub struct CompassService<O: OrientationProvider> {
    inner: Arc<Mutex<ServiceState<O>>>,
}

impl<O: OrientationProvider> Clone for CompassService<O> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<O: OrientationProvider> CompassService<O> {
    /// Wraps a provider. Nothing is subscribed until a lease is taken and
    /// permission is granted.
    pub fn new(provider: O) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ServiceState {
                fuser: CompassFuser::new(provider),
                leases: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ServiceState<O>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a user of the compass.
    ///
    /// The first lease subscribes if permission is already Granted.
    pub fn acquire(&self) -> CompassLease<O> {
        let mut state = self.lock();
        state.leases += 1;
        trace!(leases = state.leases, "Compass lease acquired");
        state.reconcile();
        drop(state);

        CompassLease { service: self.clone() }
    }

    fn release(&self) {
        let mut state = self.lock();
        state.leases = state.leases.saturating_sub(1);
        trace!(leases = state.leases, "Compass lease released");
        state.reconcile();
    }

    /// See [`CompassFuser::request_permission`].
    pub fn request_permission(&self) -> PermissionState {
        let mut state = self.lock();
        let permission = state.fuser.resolve_permission();
        state.reconcile();
        permission
    }

    /// Current permission state.
    pub fn permission(&self) -> PermissionState {
        self.lock().fuser.permission()
    }

    /// Applies queued readings.
    pub fn dispatch_pending(&self) -> usize {
        self.lock().fuser.dispatch_pending()
    }

    /// See [`CompassFuser::fused_rotation`].
    pub fn fused_rotation(&self, bearing: f64) -> f64 {
        self.lock().fuser.fused_rotation(bearing)
    }

    /// Latest heading in degrees.
    pub fn heading(&self) -> Option<f64> {
        self.lock().fuser.heading()
    }

    /// Latest normalised sample.
    pub fn latest(&self) -> Option<OrientationSample> {
        self.lock().fuser.latest()
    }

    /// True while subscribed to the sensor.
    pub fn is_active(&self) -> bool {
        self.lock().fuser.is_active()
    }

    /// Number of live leases.
    pub fn lease_count(&self) -> usize {
        self.lock().leases
    }

    /// Runs `f` against the provider.
    pub fn with_provider<R>(&self, f: impl FnOnce(&O) -> R) -> R {
        f(self.lock().fuser.provider())
    }
}

/// Keeps the shared compass subscribed while alive.
pub struct CompassLease<O: OrientationProvider> {
    service: CompassService<O>,
}

impl<O: OrientationProvider> CompassLease<O> {
    /// The service this lease belongs to.
    pub fn service(&self) -> &CompassService<O> {
        &self.service
    }
}

impl<O: OrientationProvider> Drop for CompassLease<O> {
    fn drop(&mut self) {
        self.service.release();
    }
}
