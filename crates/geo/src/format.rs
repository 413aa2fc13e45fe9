//! Human-friendly distance labels.

/// Renders a distance for display.
///
/// - below 0.1 km: whole meters (`"73 m"`)
/// - below 1 km: kilometers with two decimals (`"0.50 km"`)
/// - otherwise: kilometers with one decimal (`"2.3 km"`)
///
/// The input must be finite and non-negative.
///
/// # Example
/// ```
/// use velo_geo::format_distance;
///
/// assert_eq!(format_distance(0.073), "73 m");
/// assert_eq!(format_distance(2.3), "2.3 km");
/// ```
pub fn format_distance(km: f64) -> String {
    debug_assert!(km.is_finite() && km >= 0.0, "distance must be finite and non-negative: {km}");

    if km < 0.1 {
        format!("{:.0} m", km * 1000.0)
    } else if km < 1.0 {
        format!("{km:.2} km")
    } else {
        format!("{km:.1} km")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meters() {
        assert_eq!(format_distance(0.073), "73 m");
        assert_eq!(format_distance(0.0), "0 m");
        assert_eq!(format_distance(0.0994), "99 m");
    }

    #[test]
    fn test_sub_kilometer() {
        assert_eq!(format_distance(0.5), "0.50 km");
        assert_eq!(format_distance(0.1), "0.10 km");
        assert_eq!(format_distance(0.999), "1.00 km");
    }

    #[test]
    fn test_kilometers() {
        assert_eq!(format_distance(2.3), "2.3 km");
        assert_eq!(format_distance(1.0), "1.0 km");
        assert_eq!(format_distance(12.34), "12.3 km");
    }
}
