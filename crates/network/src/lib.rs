//! Station data for bike-share networks.
//!
//! Loads a network from the citybik.es v2 API and exposes the pieces a
//! station detail page needs:
//! - **Stations**: availability, address, and status helpers
//! - **Lookup**: by id, by free-text search, or by distance
//! - **Client**: HTTP fetch with exponential backoff on transient failures
//!
//! # Example
//!
//! ```no_run
//! use velo_network::prelude::*;
//!
//! # async fn example() -> NetworkResult<()> {
//! let client = CitybikesClient::new()?;
//! let network = client.fetch_network().await?;
//!
//! for station in network.search("station") {
//!     println!("{}: {} bikes", station.name, station.free_bikes);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod network;
pub mod station;

pub use client::CitybikesClient;
pub use config::{ClientConfig, RetryConfig, DEFAULT_API_URL, DEFAULT_NETWORK};
pub use error::{NetworkError, NetworkResult};
pub use network::{Network, NetworkLocation, NetworkResponse};
pub use station::{Station, StationExtra, StationStatus, ADDRESS_UNAVAILABLE};

/// Prelude for common imports
pub mod prelude {
    pub use crate::client::CitybikesClient;
    pub use crate::config::ClientConfig;
    pub use crate::error::{NetworkError, NetworkResult};
    pub use crate::network::Network;
    pub use crate::station::{Station, StationStatus};
}
