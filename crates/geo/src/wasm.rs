//! WASM bindings for the geo crate.
//!
//! These bindings let the station detail page compute the arrow and the
//! distance label directly in the browser.

use crate::{bearing_degrees, format_distance, haversine_distance, normalize_degrees, Coordinate};
use wasm_bindgen::prelude::*;

/// Calculate distance between two coordinates in kilometers.
#[wasm_bindgen]
pub fn distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let from = Coordinate::new(lat1, lng1);
    let to = Coordinate::new(lat2, lng2);
    haversine_distance(&from, &to)
}

/// Initial bearing from the first coordinate to the second, in `[0, 360)`.
#[wasm_bindgen]
pub fn bearing(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let from = Coordinate::new(lat1, lng1);
    let to = Coordinate::new(lat2, lng2);
    bearing_degrees(&from, &to)
}

/// Distance label for display ("73 m", "0.50 km", "2.3 km").
///
/// Rejects negative and non-finite input instead of panicking in the page.
#[wasm_bindgen]
pub fn format_distance_label(km: f64) -> Result<String, JsValue> {
    if !km.is_finite() || km < 0.0 {
        return Err(JsValue::from_str(&format!("invalid distance: {}", km)));
    }
    Ok(format_distance(km))
}

/// Arrow rotation for a normalized compass heading and a target bearing.
///
/// Pass `NaN` as the heading when no compass reading is available; the
/// bearing is then returned unchanged.
#[wasm_bindgen]
pub fn fused_rotation(heading: f64, bearing: f64) -> f64 {
    if heading.is_nan() {
        bearing
    } else {
        normalize_degrees(heading + bearing)
    }
}
