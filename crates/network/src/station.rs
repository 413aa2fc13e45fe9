//! Station records as served by the citybik.es v2 API.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use velo_geo::{Coordinate, Located};

/// Shown when a station has no address.
pub const ADDRESS_UNAVAILABLE: &str = "Address unavailable";

/// One docking station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    /// Upstream station id
    pub id: String,
    /// Display name
    pub name: String,
    /// When the upstream feed last refreshed this station
    pub timestamp: DateTime<Utc>,
    /// Bikes ready to take
    #[serde(default, deserialize_with = "null_as_zero")]
    pub free_bikes: u32,
    /// Free docks to return a bike to
    #[serde(default, deserialize_with = "null_as_zero")]
    pub empty_slots: u32,
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Network-specific extras
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<StationExtra>,
}

/// Optional per-network fields. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StationExtra {
    /// Street address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Upstream status string, e.g. `"OPEN"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Some networks report `null` counts for stations that are offline.
fn null_as_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or_default())
}

/// Whether a station is accepting rentals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationStatus {
    /// Upstream reports `OPEN`
    Open,
    /// Upstream reports anything else
    Closed,
    /// No status reported
    Unknown,
}

impl fmt::Display for StationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
            Self::Unknown => "Status unavailable",
        };
        f.write_str(label)
    }
}

impl Station {
    /// Where the station is.
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    /// Street address, if the network reports one.
    pub fn address(&self) -> Option<&str> {
        self.extra
            .as_ref()
            .and_then(|e| e.address.as_deref())
            .filter(|a| !a.trim().is_empty())
    }

    /// Street address or [`ADDRESS_UNAVAILABLE`].
    pub fn address_or_default(&self) -> &str {
        self.address().unwrap_or(ADDRESS_UNAVAILABLE)
    }

    /// Raw upstream status string.
    pub fn raw_status(&self) -> Option<&str> {
        self.extra.as_ref().and_then(|e| e.status.as_deref())
    }

    /// Rental status; only an exact `OPEN` counts as open.
    pub fn status(&self) -> StationStatus {
        match self.raw_status() {
            Some("OPEN") => StationStatus::Open,
            Some(_) => StationStatus::Closed,
            None => StationStatus::Unknown,
        }
    }

    /// Bikes plus free docks.
    pub fn total_docks(&self) -> u32 {
        self.free_bikes.saturating_add(self.empty_slots)
    }

    /// Share of docks holding a bike, in `[0, 1]`.
    ///
    /// `None` when the station reports no docks at all.
    pub fn capacity_ratio(&self) -> Option<f64> {
        match self.total_docks() {
            0 => None,
            total => Some(f64::from(self.free_bikes) / f64::from(total)),
        }
    }

    /// Last update in the local time zone, e.g. `2024-05-01 14:03:12`.
    pub fn last_updated_label(&self) -> String {
        self.timestamp
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }

    /// Case-insensitive substring match on name or address.
    ///
    /// `needle` must already be lowercase.
    pub(crate) fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self
                .address()
                .is_some_and(|a| a.to_lowercase().contains(needle))
    }
}

impl Located for Station {
    fn location(&self) -> Option<Coordinate> {
        Some(self.coordinate())
    }
}
