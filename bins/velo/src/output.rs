//! Terminal rendering for stations and pointers.

use owo_colors::OwoColorize;
use velo_geo::{format_distance, CompassPoint};
use velo_navigation::{Pointer, PointerState};
use velo_network::{Station, StationStatus};

/// Status message helpers
pub struct Status;

impl Status {
    /// Print an error message
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Print a warning message
    pub fn warning(message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print a header
    pub fn header(message: &str) {
        println!();
        println!("{}", message.bold());
        println!("{}", "─".repeat(message.chars().count()));
    }
}

/// Arrow glyph for a screen rotation, snapped to eight directions.
pub fn arrow(rotation_degrees: f64) -> char {
    match CompassPoint::from_bearing(rotation_degrees) {
        CompassPoint::N => '↑',
        CompassPoint::NE => '↗',
        CompassPoint::E => '→',
        CompassPoint::SE => '↘',
        CompassPoint::S => '↓',
        CompassPoint::SW => '↙',
        CompassPoint::W => '←',
        CompassPoint::NW => '↖',
    }
}

/// `"7 bikes · 21 docks"`
pub fn availability(station: &Station) -> String {
    format!(
        "{} · {}",
        format_count(station.free_bikes, "bike", "bikes"),
        format_count(station.empty_slots, "dock", "docks")
    )
}

/// Fill bar for the share of docks holding a bike.
pub fn capacity_bar(ratio: Option<f64>, width: usize) -> String {
    let Some(ratio) = ratio else {
        return "·".repeat(width);
    };
    let filled = ((ratio.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// One-line summary of a pointer state.
pub fn pointer_line(state: &PointerState) -> String {
    match state {
        PointerState::Idle => "no station selected".to_string(),
        PointerState::Waiting => "waiting for position…".to_string(),
        PointerState::Ready(pointer) => format!(
            "{} {} {} ({:.0}°){}",
            arrow(pointer.rotation_degrees),
            pointer.distance_label,
            pointer.compass_point,
            pointer.bearing_degrees,
            if pointer.heading_applied { "" } else { " · no compass" }
        ),
        PointerState::Unavailable(kind) => format!("bearing unavailable: {kind}"),
    }
}

fn format_count(count: u32, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

fn status_label(status: StationStatus) -> String {
    match status {
        StationStatus::Open => status.to_string().green().to_string(),
        StationStatus::Closed => status.to_string().red().to_string(),
        StationStatus::Unknown => status.to_string().dimmed().to_string(),
    }
}

/// List row, optionally with the distance from the user.
pub fn print_station_line(station: &Station, distance_km: Option<f64>) {
    let distance = distance_km
        .map(|km| format!("{:>8}", format_distance(km)))
        .unwrap_or_default();

    println!(
        "{} {} {}  {}  {}",
        distance.cyan(),
        capacity_bar(station.capacity_ratio(), 8),
        station.name.bold(),
        availability(station).dimmed(),
        format!("[{}]", station.id).dimmed()
    );
}

/// Detail view of one station.
pub fn print_station_card(station: &Station, pointer: Option<&Pointer>) {
    Status::header(&station.name);
    println!("  {:<12} {}", "Address".dimmed(), station.address_or_default());
    println!("  {:<12} {}", "Status".dimmed(), status_label(station.status()));
    println!(
        "  {:<12} {}  {}",
        "Available".dimmed(),
        capacity_bar(station.capacity_ratio(), 12),
        availability(station)
    );
    println!("  {:<12} {}", "Updated".dimmed(), station.last_updated_label());

    if let Some(pointer) = pointer {
        println!(
            "  {:<12} {}",
            "Direction".dimmed(),
            pointer_line(&PointerState::Ready(pointer.clone())).bold()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use velo_navigation::LocationErrorKind;

    fn pointer(rotation: f64, heading_applied: bool) -> Pointer {
        Pointer {
            distance_km: 1.312,
            distance_label: "1.3 km".to_string(),
            bearing_degrees: 32.05,
            rotation_degrees: rotation,
            compass_point: CompassPoint::NE,
            heading_applied,
        }
    }

    #[test]
    fn test_arrow() {
        assert_eq!(arrow(0.0), '↑');
        assert_eq!(arrow(44.0), '↗');
        assert_eq!(arrow(180.0), '↓');
        assert_eq!(arrow(350.0), '↑');
    }

    #[test]
    fn test_capacity_bar() {
        assert_eq!(capacity_bar(Some(0.25), 8), "██░░░░░░");
        assert_eq!(capacity_bar(Some(1.0), 4), "████");
        assert_eq!(capacity_bar(None, 3), "···");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(1, "bike", "bikes"), "1 bike");
        assert_eq!(format_count(0, "bike", "bikes"), "0 bikes");
    }

    #[test]
    fn test_pointer_line() {
        assert_eq!(
            pointer_line(&PointerState::Ready(pointer(32.05, false))),
            "↗ 1.3 km NE (32°) · no compass"
        );
        assert_eq!(pointer_line(&PointerState::Ready(pointer(302.05, true))), "↖ 1.3 km NE (32°)");
        assert_eq!(pointer_line(&PointerState::Waiting), "waiting for position…");
        assert!(pointer_line(&PointerState::Unavailable(LocationErrorKind::Timeout)).starts_with("bearing unavailable"));
    }
}
