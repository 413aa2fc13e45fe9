//! Initial great-circle bearing.

use crate::Coordinate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Folds any finite angle into `[0, 360)`.
///
/// Values that round up to exactly 360.0, and negative zero, fold to 0.0.
#[inline]
pub fn normalize_degrees(degrees: f64) -> f64 {
    let folded = degrees.rem_euclid(360.0);
    if folded >= 360.0 || folded == 0.0 { 0.0 } else { folded }
}

/// Calculates the initial bearing from `from` to `to` along the great circle.
///
/// The result is in degrees clockwise from true north, normalized into
/// `[0, 360)`. Identical points have no defined bearing; `0.0` is returned
/// for them rather than NaN.
///
/// The bearing is not symmetric: the return bearing generally differs from
/// the outbound one by something other than 180 degrees.
///
/// # Example
/// ```
/// use velo_geo::{bearing_degrees, Coordinate};
///
/// let origin = Coordinate::new(0.0, 0.0);
/// let east = Coordinate::new(0.0, 10.0);
/// assert!((bearing_degrees(&origin, &east) - 90.0).abs() < 1e-9);
/// ```
pub fn bearing_degrees(from: &Coordinate, to: &Coordinate) -> f64 {
    if from == to {
        return 0.0;
    }

    let (lat1, lon1) = from.to_radians();
    let (lat2, lon2) = to.to_radians();
    let d_lon = lon2 - lon1;

    let y = d_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();

    normalize_degrees(y.atan2(x).to_degrees())
}

/// Eight-point compass rose label for a bearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompassPoint {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl CompassPoint {
    const ALL: [CompassPoint; 8] = [
        Self::N,
        Self::NE,
        Self::E,
        Self::SE,
        Self::S,
        Self::SW,
        Self::W,
        Self::NW,
    ];

    /// Nearest compass point; each sector spans 45 degrees centred on its label.
    pub fn from_bearing(bearing: f64) -> Self {
        let sector = ((normalize_degrees(bearing) + 22.5) / 45.0).floor() as usize % 8;
        Self::ALL[sector]
    }

    /// Short label, e.g. `"NE"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::N => "N",
            Self::NE => "NE",
            Self::E => "E",
            Self::SE => "SE",
            Self::S => "S",
            Self::SW => "SW",
            Self::W => "W",
            Self::NW => "NW",
        }
    }
}

impl fmt::Display for CompassPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
