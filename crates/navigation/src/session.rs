//! Detail-view controller.
//!
//! A [`NavigationSession`] is what a station detail page holds: one
//! tracker for the selected station plus a lease on the shared compass.
//! [`NavigationSession::pump`] folds whatever arrived on both streams into
//! a [`PointerState`] for rendering.

use crate::compass::{CompassLease, CompassService, OrientationSample};
use crate::error::LocationErrorKind;
use crate::provider::{OrientationProvider, PositionProvider, WatchOptions};
use crate::tracker::LocationTracker;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;
use velo_geo::{format_distance, CompassPoint, Coordinate, NavigationResult};

/// What the arrow and the distance label should show.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pointer {
    /// Distance to the station in kilometers
    pub distance_km: f64,
    /// Distance formatted for display
    pub distance_label: String,
    /// Bearing from the user to the station
    pub bearing_degrees: f64,
    /// Arrow rotation: bearing fused with the compass heading when available
    pub rotation_degrees: f64,
    /// Eight-point label for the bearing
    pub compass_point: CompassPoint,
    /// Whether `rotation_degrees` includes a compass heading
    pub heading_applied: bool,
}

impl Pointer {
    /// Pointer for `result`, rotated by `heading` when one is known.
    pub fn new(result: NavigationResult, heading: Option<OrientationSample>) -> Self {
        let bearing = result.bearing_degrees;
        Self {
            distance_km: result.distance_km,
            distance_label: format_distance(result.distance_km),
            bearing_degrees: bearing,
            rotation_degrees: heading.map_or(bearing, |sample| sample.rotate(bearing)),
            compass_point: CompassPoint::from_bearing(bearing),
            heading_applied: heading.is_some(),
        }
    }
}

/// Rendering state of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum PointerState {
    /// No station selected
    Idle,
    /// Tracking, no fix yet
    Waiting,
    /// Latest pointer
    Ready(Pointer),
    /// Tracking failed; show "bearing unavailable"
    Unavailable(LocationErrorKind),
}

#[derive(Debug, Default)]
enum Fix {
    #[default]
    None,
    Result(NavigationResult),
    Failed(LocationErrorKind),
}

/// One open station detail view.
pub struct NavigationSession<P: PositionProvider, O: OrientationProvider> {
    tracker: LocationTracker<P>,
    compass: CompassService<O>,
    lease: Option<CompassLease<O>>,
    fix: Arc<Mutex<Fix>>,
}

impl<P: PositionProvider, O: OrientationProvider> NavigationSession<P, O> {
    /// Opens a session and takes a compass lease.
    pub fn new(provider: P, compass: CompassService<O>) -> Self {
        Self::with_options(provider, compass, WatchOptions::default())
    }

    /// Opens a session with explicit watch options.
    pub fn with_options(provider: P, compass: CompassService<O>, options: WatchOptions) -> Self {
        let lease = compass.acquire();
        Self {
            tracker: LocationTracker::with_options(provider, options),
            compass,
            lease: Some(lease),
            fix: Arc::new(Mutex::new(Fix::None)),
        }
    }

    fn fix(&self) -> MutexGuard<'_, Fix> {
        lock(&self.fix)
    }

    /// Points the session at a station, replacing any previous one.
    pub fn set_target(&mut self, target: Coordinate) {
        *self.fix() = Fix::None;

        let on_update = Arc::clone(&self.fix);
        let on_error = Arc::clone(&self.fix);
        self.tracker.start(
            target,
            move |result| *lock(&on_update) = Fix::Result(result),
            move |kind| *lock(&on_error) = Fix::Failed(kind),
        );
        debug!(target = %target, "Navigation target set");
    }

    /// The shared compass.
    pub fn compass(&self) -> &CompassService<O> {
        &self.compass
    }

    /// The session's tracker.
    pub fn tracker(&self) -> &LocationTracker<P> {
        &self.tracker
    }

    /// Drains both streams and returns the current state.
    pub fn pump(&mut self) -> PointerState {
        self.tracker.dispatch_pending();
        self.compass.dispatch_pending();
        self.state()
    }

    /// Waits for the next position event, then drains both streams.
    pub async fn next(&mut self) -> PointerState {
        self.tracker.next().await;
        self.pump()
    }

    /// Current state without draining.
    pub fn state(&self) -> PointerState {
        if self.tracker.target().is_none() && matches!(*self.fix(), Fix::None) {
            return PointerState::Idle;
        }

        match *self.fix() {
            Fix::None => PointerState::Waiting,
            Fix::Failed(kind) => PointerState::Unavailable(kind),
            Fix::Result(result) => PointerState::Ready(Pointer::new(result, self.compass.latest())),
        }
    }

    /// Stops tracking and releases the compass lease. Idempotent.
    pub fn close(&mut self) {
        self.tracker.stop();
        *self.fix() = Fix::None;
        if self.lease.take().is_some() {
            debug!("Navigation session closed");
        }
    }
}

impl<P: PositionProvider, O: OrientationProvider> Drop for NavigationSession<P, O> {
    fn drop(&mut self) {
        self.close();
    }
}

fn lock(fix: &Mutex<Fix>) -> MutexGuard<'_, Fix> {
    fix.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compass::PermissionState;
    use crate::feed::{OrientationFeed, PositionFeed};
    use crate::provider::OrientationReading;

    const HERE: Coordinate = Coordinate::new(51.2194, 4.4025);
    const STATION: Coordinate = Coordinate::new(51.2294, 4.4125);

    fn session() -> (NavigationSession<PositionFeed, OrientationFeed>, PositionFeed, OrientationFeed) {
        let positions = PositionFeed::new();
        let orientation = OrientationFeed::new();
        let compass = CompassService::new(orientation.clone());
        let session = NavigationSession::new(positions.clone(), compass);
        (session, positions, orientation)
    }

    #[test]
    fn test_idle_until_target() {
        let (mut session, _, _) = session();
        assert_eq!(session.pump(), PointerState::Idle);

        session.set_target(STATION);
        assert_eq!(session.pump(), PointerState::Waiting);
    }

    #[test]
    fn test_bearing_only_without_compass() {
        let (mut session, positions, _) = session();
        session.set_target(STATION);
        positions.push(HERE);

        let PointerState::Ready(pointer) = session.pump() else {
            panic!("expected a pointer");
        };
        assert!(!pointer.heading_applied);
        assert_eq!(pointer.rotation_degrees, pointer.bearing_degrees);
        assert_eq!(pointer.distance_label, "1.3 km");
        assert_eq!(pointer.compass_point, CompassPoint::NE);
    }

    #[test]
    fn test_heading_fused_into_rotation() {
        let (mut session, positions, orientation) = session();
        assert_eq!(session.compass().request_permission(), PermissionState::Granted);

        session.set_target(STATION);
        positions.push(HERE);
        orientation.push(OrientationReading::CompassHeading(-90.0));

        let PointerState::Ready(pointer) = session.pump() else {
            panic!("expected a pointer");
        };
        assert!(pointer.heading_applied);
        let expected = (pointer.bearing_degrees + 90.0).rem_euclid(360.0);
        assert!((pointer.rotation_degrees - expected).abs() < 1e-9);
    }

    #[test]
    fn test_nan_heading_leaves_pointer_on_bearing() {
        let (mut session, positions, orientation) = session();
        session.compass().request_permission();

        session.set_target(STATION);
        positions.push(HERE);
        orientation.push(OrientationReading::CompassHeading(f64::NAN));

        let PointerState::Ready(pointer) = session.pump() else {
            panic!("expected a pointer");
        };
        assert!(!pointer.heading_applied);
        assert_eq!(pointer.rotation_degrees, pointer.bearing_degrees);
        assert_eq!(pointer.compass_point, CompassPoint::NE);
    }

    #[test]
    fn test_pointer_new() {
        let result = NavigationResult::between(&HERE, &STATION);
        let heading = OrientationSample::from_reading(OrientationReading::CompassHeading(90.0));

        let bare = Pointer::new(result, None);
        assert_eq!(bare.rotation_degrees, result.bearing_degrees);
        assert!(!bare.heading_applied);

        let rotated = Pointer::new(result, heading);
        assert!(rotated.heading_applied);
        let expected = (result.bearing_degrees - 90.0).rem_euclid(360.0);
        assert!((rotated.rotation_degrees - expected).abs() < 1e-9);
        assert_eq!(rotated.distance_label, bare.distance_label);
    }

    #[test]
    fn test_failure_degrades() {
        let (mut session, positions, _) = session();
        session.set_target(STATION);
        positions.push_error(LocationErrorKind::PermissionDenied);

        assert_eq!(session.pump(), PointerState::Unavailable(LocationErrorKind::PermissionDenied));
    }

    #[test]
    fn test_switching_station_rearms() {
        let (mut session, positions, _) = session();
        session.set_target(STATION);
        positions.push(HERE);
        assert!(matches!(session.pump(), PointerState::Ready(_)));

        session.set_target(HERE);
        assert_eq!(session.pump(), PointerState::Waiting);
        assert_eq!(positions.active_watches(), 1);
        assert_eq!(positions.cleared_watches(), 1);
    }

    #[test]
    fn test_close_releases_everything() {
        let (mut session, positions, orientation) = session();
        let compass = session.compass().clone();
        compass.request_permission();
        session.set_target(STATION);

        assert_eq!(compass.lease_count(), 1);
        assert_eq!(orientation.active_subscriptions(), 1);

        drop(session);

        assert_eq!(compass.lease_count(), 0);
        assert_eq!(orientation.active_subscriptions(), 0);
        assert_eq!(positions.active_watches(), 0);
    }

    #[test]
    fn test_two_views_share_one_compass() {
        let orientation = OrientationFeed::new();
        let compass = CompassService::new(orientation.clone());
        compass.request_permission();

        let first = NavigationSession::new(PositionFeed::new(), compass.clone());
        let mut second = NavigationSession::new(PositionFeed::new(), compass.clone());

        assert_eq!(orientation.subscribe_calls(), 1);
        second.close();
        assert_eq!(orientation.active_subscriptions(), 1);
        drop(first);
        assert_eq!(orientation.active_subscriptions(), 0);
    }
}
