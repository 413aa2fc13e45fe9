//! Error types for location tracking and compass access.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for navigation operations.
pub type Result<T> = std::result::Result<T, NavigationError>;

/// Why the device position provider stopped delivering samples.
///
/// Reported through the tracker's error callback; none of these are fatal
/// to the rest of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationErrorKind {
    /// The user or platform refused access to the location
    #[error("location permission denied")]
    PermissionDenied,

    /// The provider could not determine a position
    #[error("position unavailable")]
    PositionUnavailable,

    /// No sample arrived within the configured timeout
    #[error("timed out waiting for a position")]
    Timeout,
}

/// Errors raised by sensor providers.
#[derive(Debug, Error)]
pub enum NavigationError {
    /// Position provider failure
    #[error(transparent)]
    Location(#[from] LocationErrorKind),

    /// Orientation sensor failure (missing hardware, rejected listener, ...)
    #[error("orientation sensor error: {0}")]
    Sensor(String),
}

impl NavigationError {
    /// Create a sensor error
    pub fn sensor(msg: impl Into<String>) -> Self {
        Self::Sensor(msg.into())
    }
}
