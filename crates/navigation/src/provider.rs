//! Device capabilities consumed by the tracker and the compass.
//!
//! The browser geolocation and device-orientation APIs sit behind these
//! traits. Implementations push events through a [`Sink`]; they never hold
//! a reference back to the consumer.

use crate::error::{LocationErrorKind, Result};
use crate::subscription::{Sink, SubscriptionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use velo_geo::Coordinate;

/// Default wait for each position sample.
pub const DEFAULT_POSITION_TIMEOUT: Duration = Duration::from_secs(10);

/// Options passed to [`PositionProvider::watch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchOptions {
    /// Ask for GPS-grade accuracy rather than network positioning
    pub enable_high_accuracy: bool,
    /// Oldest cached position the provider may return
    #[serde(with = "duration_millis")]
    pub maximum_age: Duration,
    /// Longest wait for each sample before reporting a timeout
    #[serde(with = "duration_millis")]
    pub timeout: Duration,
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        u64::try_from(duration.as_millis()).unwrap_or(u64::MAX).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

impl Default for WatchOptions {
    /// High accuracy, never a cached fix, bounded wait.
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            maximum_age: Duration::ZERO,
            timeout: DEFAULT_POSITION_TIMEOUT,
        }
    }
}

impl WatchOptions {
    /// Defaults, with the timeout taken from `VELO_POSITION_TIMEOUT_MS` when set.
    ///
    /// Unparseable or zero values fall back to the default timeout.
    pub fn from_env() -> Self {
        let timeout = env::var("VELO_POSITION_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map_or(DEFAULT_POSITION_TIMEOUT, Duration::from_millis);

        Self { timeout, ..Self::default() }
    }

    /// Builder-style method to set the per-sample timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// One reading from the position provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    /// Where the device was
    pub coordinate: Coordinate,
    /// When the provider captured it
    pub captured_at: DateTime<Utc>,
}

impl PositionSample {
    /// A sample captured now.
    pub fn now(coordinate: Coordinate) -> Self {
        Self { coordinate, captured_at: Utc::now() }
    }
}

/// What a position provider can deliver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionEvent {
    /// A new fix
    Sample(PositionSample),
    /// The watch failed and will deliver nothing more
    Failed(LocationErrorKind),
}

/// Delivery handle for one position watch.
pub type PositionSink = Sink<PositionEvent>;

impl Sink<PositionEvent> {
    /// Queues a new fix.
    pub fn send_sample(&self, sample: PositionSample) -> bool {
        self.send(PositionEvent::Sample(sample))
    }

    /// Queues a failure.
    pub fn send_error(&self, kind: LocationErrorKind) -> bool {
        self.send(PositionEvent::Failed(kind))
    }
}

/// A continuous source of device positions.
pub trait PositionProvider: Send {
    /// Begins a watch. Samples and failures go to `sink` until
    /// [`clear_watch`](Self::clear_watch) is called with its id.
    ///
    /// An error here means the watch never started.
    fn watch(&mut self, options: &WatchOptions, sink: PositionSink) -> std::result::Result<(), LocationErrorKind>;

    /// Ends a watch. Unknown ids are ignored.
    fn clear_watch(&mut self, watch: SubscriptionId);
}

/// A raw orientation event as a platform reports it.
///
/// A platform delivers one field or the other, never both.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "degrees", rename_all = "snake_case")]
pub enum OrientationReading {
    /// Native compass heading, degrees clockwise from north
    CompassHeading(f64),
    /// Raw rotation about the z-axis (`alpha`), counter-clockwise
    Alpha(f64),
}

impl OrientationReading {
    /// The raw value, whichever field carried it.
    pub fn degrees(&self) -> f64 {
        match *self {
            Self::CompassHeading(value) | Self::Alpha(value) => value,
        }
    }
}

/// Delivery handle for one orientation subscription.
pub type OrientationSink = Sink<OrientationReading>;

/// Outcome of a platform permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionResponse {
    /// Access allowed
    Granted,
    /// Access refused
    Denied,
}

/// The device's orientation sensor.
pub trait OrientationProvider: Send {
    /// Whether the platform gates orientation behind an explicit prompt.
    fn requires_permission(&self) -> bool;

    /// Shows the platform prompt. Only called when
    /// [`requires_permission`](Self::requires_permission) is true, and only
    /// from a user gesture.
    fn request_permission(&mut self) -> Result<PermissionResponse>;

    /// Starts delivering readings to `sink`.
    fn subscribe(&mut self, sink: OrientationSink) -> Result<()>;

    /// Stops a subscription. Unknown ids are ignored.
    fn unsubscribe(&mut self, subscription: SubscriptionId);
}
