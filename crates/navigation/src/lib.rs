//! Live navigation to a bike-share station.
//!
//! This crate turns two device streams into what a station detail page
//! draws:
//! - **Position**: a [`LocationTracker`] watches the device location and
//!   recomputes distance and bearing to the selected station on every fix
//! - **Orientation**: a [`CompassFuser`] gates the compass behind a
//!   one-shot permission request and rotates the bearing by the device
//!   heading; [`CompassService`] shares it across views
//! - **Session**: a [`NavigationSession`] composes both for one view
//!
//! Providers deliver events through subscription sinks into queues owned by
//! the consumer; everything is dispatched on the caller's thread.
//!
//! # Example
//!
//! ```
//! use velo_geo::Coordinate;
//! use velo_navigation::{CompassService, NavigationSession, OrientationFeed, PointerState, PositionFeed};
//!
//! let positions = PositionFeed::new();
//! let compass = CompassService::new(OrientationFeed::new());
//!
//! let mut session = NavigationSession::new(positions.clone(), compass);
//! session.set_target(Coordinate::new(51.2294, 4.4125));
//! positions.push(Coordinate::new(51.2194, 4.4025));
//!
//! match session.pump() {
//!     PointerState::Ready(pointer) => assert_eq!(pointer.distance_label, "1.3 km"),
//!     other => panic!("unexpected state: {other:?}"),
//! }
//! ```

pub mod compass;
pub mod error;
pub mod feed;
pub mod provider;
pub mod session;
pub mod subscription;
pub mod tracker;

pub use compass::{
    CompassFuser, CompassLease, CompassService, OrientationSample, PermissionState, PlatformConvention,
};
pub use error::{LocationErrorKind, NavigationError, Result};
pub use feed::{OrientationFeed, PositionFeed};
pub use provider::{
    OrientationProvider, OrientationReading, OrientationSink, PermissionResponse, PositionEvent,
    PositionProvider, PositionSample, PositionSink, WatchOptions,
};
pub use session::{NavigationSession, Pointer, PointerState};
pub use subscription::{Sink, SubscriptionId};
pub use tracker::{LocationTracker, TrackerState};

pub use velo_geo::NavigationResult;
