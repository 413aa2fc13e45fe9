//! Configuration for the station feed client
//!
//! Supports environment-based configuration with sensible defaults.

use crate::error::{NetworkError, NetworkResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Public citybik.es API
pub const DEFAULT_API_URL: &str = "https://api.citybik.es/v2";

/// Antwerp's Velo network
pub const DEFAULT_NETWORK: &str = "velo-antwerpen";

/// Retry policy for transient failures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any delay
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// A config with no retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    /// Delay before `attempt` (0-based); zero for the first attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let delay_secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);

        Duration::from_secs_f64(delay_secs.min(self.max_delay.as_secs_f64()))
    }
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API root, without trailing `/networks`
    pub base_url: String,
    /// Network to load
    pub network_id: String,
    /// Request timeout
    pub timeout: Duration,
    /// Retry configuration
    pub retry: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            network_id: DEFAULT_NETWORK.to_string(),
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create configuration from environment variables
    ///
    /// Reads the following environment variables:
    /// - `VELO_API_URL`: API root (default: public citybik.es v2)
    /// - `VELO_NETWORK`: network id (default: `velo-antwerpen`)
    /// - `VELO_TIMEOUT_SECS`: request timeout in seconds
    pub fn from_env() -> NetworkResult<Self> {
        let defaults = Self::default();

        let base_url = env::var("VELO_API_URL").unwrap_or(defaults.base_url);
        let network_id = env::var("VELO_NETWORK").unwrap_or(defaults.network_id);

        let timeout = match env::var("VELO_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map(Duration::from_secs)
                .map_err(|_| NetworkError::config(format!("VELO_TIMEOUT_SECS is not a number: {raw}")))?,
            Err(_) => defaults.timeout,
        };

        let config = Self {
            base_url,
            network_id,
            timeout,
            retry: defaults.retry,
        };
        config.validate()?;
        Ok(config)
    }

    /// Builder-style method to set base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Builder-style method to set the network
    #[must_use]
    pub fn with_network(mut self, network_id: impl Into<String>) -> Self {
        self.network_id = network_id.into();
        self
    }

    /// Builder-style method to set timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder-style method to set retry config
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// URL of the configured network's station list
    pub fn network_url(&self) -> String {
        format!("{}/networks/{}", self.base_url.trim_end_matches('/'), self.network_id)
    }

    /// Validate the configuration
    pub fn validate(&self) -> NetworkResult<()> {
        if self.base_url.is_empty() {
            return Err(NetworkError::config("base_url cannot be empty"));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(NetworkError::config("base_url must start with http:// or https://"));
        }

        if self.network_id.trim().is_empty() || self.network_id.contains('/') {
            return Err(NetworkError::config(format!("invalid network id: '{}'", self.network_id)));
        }

        if self.timeout.is_zero() {
            return Err(NetworkError::config("timeout cannot be zero"));
        }

        if self.retry.max_attempts == 0 {
            return Err(NetworkError::config("retry.max_attempts must be at least 1"));
        }

        Ok(())
    }
}
