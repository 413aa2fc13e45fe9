//! Geodesic helpers for station navigation.
//!
//! This crate provides:
//! - Haversine distance calculations
//! - Initial great-circle bearing and compass-point labels
//! - Human-friendly distance formatting
//! - Nearest-first ranking with optional parallelism
//! - WASM bindings for browser usage
//!
//! # Example
//!
//! ```
//! use velo_geo::{bearing_degrees, distance_km, format_distance, Coordinate};
//!
//! let here = Coordinate::new(51.2194, 4.4025);   // Antwerp, Groenplaats
//! let station = Coordinate::new(51.2294, 4.4125);
//!
//! let km = distance_km(&here, &station);
//! assert!((km - 1.3).abs() < 0.1);
//! assert_eq!(format_distance(km), "1.3 km");
//! assert!((bearing_degrees(&here, &station) - 32.0).abs() < 1.0);
//! ```

mod bearing;
mod error;
mod format;
mod haversine;
pub mod batch;

#[cfg(feature = "wasm")]
mod wasm;

pub use batch::{rank_by_distance, within_radius, Located, Ranked};
pub use bearing::{bearing_degrees, normalize_degrees, CompassPoint};
pub use error::{GeoError, GeoErrorCode, Result};
pub use format::format_distance;
pub use haversine::{
    distance_km, haversine_distance, haversine_distance_meters, EARTH_RADIUS_KM, EARTH_RADIUS_M,
};

use std::fmt;
use std::str::FromStr;

/// A geographic coordinate with latitude and longitude.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180)
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a new coordinate.
    ///
    /// No range check is made; out-of-range values are a caller bug.
    /// Use [`Coordinate::try_new`] when the input is untrusted.
    ///
    /// # Arguments
    /// * `latitude` - Latitude in degrees (-90 to 90)
    /// * `longitude` - Longitude in degrees (-180 to 180)
    #[inline]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Creates a coordinate, rejecting values outside the valid range.
    pub fn try_new(latitude: f64, longitude: f64) -> Result<Self> {
        let coord = Self::new(latitude, longitude);
        if coord.is_valid() {
            Ok(coord)
        } else {
            Err(GeoError::InvalidCoordinate(format!(
                "latitude {latitude}, longitude {longitude} out of range"
            )))
        }
    }

    /// Returns true if the coordinate has valid values.
    #[inline]
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Converts degrees to radians for internal calculations.
    #[inline]
    pub(crate) fn to_radians(self) -> (f64, f64) {
        (self.latitude.to_radians(), self.longitude.to_radians())
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self::new(lat, lng)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5},{:.5}", self.latitude, self.longitude)
    }
}

/// Parses `"lat,lon"` (whitespace around either part is ignored).
impl FromStr for Coordinate {
    type Err = GeoError;

    fn from_str(s: &str) -> Result<Self> {
        let (lat, lng) = s
            .split_once(',')
            .ok_or_else(|| GeoError::Parse(format!("expected 'lat,lon', got '{s}'")))?;

        let parse = |part: &str| {
            part.trim()
                .parse::<f64>()
                .map_err(|e| GeoError::Parse(format!("'{}': {e}", part.trim())))
        };

        Self::try_new(parse(lat)?, parse(lng)?)
    }
}

/// Distance and initial bearing from the user to a target.
///
/// Always a pure function of the two coordinates; it carries no identity
/// of its own and is recomputed for every new position sample.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NavigationResult {
    /// Great-circle distance in kilometers (>= 0)
    pub distance_km: f64,
    /// Initial bearing in degrees, clockwise from north, in [0, 360)
    pub bearing_degrees: f64,
}

impl NavigationResult {
    /// Computes the result for travelling from `user` to `target`.
    #[inline]
    pub fn between(user: &Coordinate, target: &Coordinate) -> Self {
        Self {
            distance_km: distance_km(user, target),
            bearing_degrees: bearing_degrees(user, target),
        }
    }

    /// Distance rendered with [`format_distance`].
    pub fn distance_label(&self) -> String {
        format_distance(self.distance_km)
    }
}
