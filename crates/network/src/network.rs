//! A bike-share network and its stations.

use crate::error::{NetworkError, NetworkResult};
use crate::station::Station;
use serde::{Deserialize, Serialize};
use velo_geo::{rank_by_distance, Coordinate, Ranked};

/// Envelope of `GET /networks/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkResponse {
    /// The network
    pub network: Network,
}

/// Where a network operates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkLocation {
    /// City name
    pub city: String,
    /// ISO country code
    pub country: String,
    /// Latitude of the city centre
    pub latitude: f64,
    /// Longitude of the city centre
    pub longitude: f64,
}

/// One city's bike-share network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    /// Upstream network id, e.g. `velo-antwerpen`
    pub id: String,
    /// Display name
    pub name: String,
    /// Where it operates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<NetworkLocation>,
    /// All stations, in upstream order
    #[serde(default)]
    pub stations: Vec<Station>,
}

impl Network {
    /// Station with this id.
    pub fn station(&self, id: &str) -> Option<&Station> {
        self.stations.iter().find(|s| s.id == id)
    }

    /// Station with this id, or [`NetworkError::TargetNotFound`].
    pub fn require_station(&self, id: &str) -> NetworkResult<&Station> {
        self.station(id)
            .ok_or_else(|| NetworkError::TargetNotFound(id.to_string()))
    }

    /// Stations whose name or address contains `query`, ignoring case.
    ///
    /// A blank query returns every station.
    pub fn search(&self, query: &str) -> Vec<&Station> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.stations.iter().collect();
        }
        self.stations.iter().filter(|s| s.matches(&needle)).collect()
    }

    /// Stations sorted by distance from `origin`, closest first.
    pub fn nearest(&self, origin: &Coordinate, limit: Option<usize>) -> Vec<Ranked<'_, Station>> {
        rank_by_distance(origin, &self.stations, limit)
    }

    /// Bikes available across the network.
    pub fn total_free_bikes(&self) -> u64 {
        self.stations.iter().map(|s| u64::from(s.free_bikes)).sum()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::VELO_ANTWERPEN;
    use super::*;

    fn network() -> Network {
        serde_json::from_str::<NetworkResponse>(VELO_ANTWERPEN).unwrap().network
    }

    #[test]
    fn test_parse_network() {
        let network = network();
        assert_eq!(network.id, "velo-antwerpen");
        assert_eq!(network.stations.len(), 3);
        assert_eq!(network.location.unwrap().city, "Antwerpen");
    }

    #[test]
    fn test_lookup() {
        let network = network();
        assert_eq!(network.station("b2").unwrap().name, "012- Centraal Station");
        assert!(network.station("zz").is_none());

        let err = network.require_station("zz").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let network = network();
        let hits: Vec<&str> = network.search("STATION").iter().map(|s| s.id.as_str()).collect();
        assert_eq!(hits, vec!["b2", "c3"]);

        let by_address = network.search("astrid");
        assert_eq!(by_address.len(), 1);
        assert_eq!(by_address[0].id, "b2");
    }

    #[test]
    fn test_blank_search_returns_all() {
        let network = network();
        assert_eq!(network.search("").len(), 3);
        assert_eq!(network.search("   ").len(), 3);
        assert!(network.search("nowhere").is_empty());
    }

    #[test]
    fn test_nearest() {
        let network = network();
        let here = Coordinate::new(51.2194, 4.4025);
        let nearest = network.nearest(&here, Some(2));

        assert_eq!(nearest.len(), 2);
        assert_eq!(nearest[0].item.id, "a1");
        assert_eq!(nearest[1].item.id, "b2");
    }

    #[test]
    fn test_total_free_bikes() {
        assert_eq!(network().total_free_bikes(), 19);
    }
}
