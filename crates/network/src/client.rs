//! HTTP client for the citybik.es station feed

use crate::config::ClientConfig;
use crate::error::{NetworkError, NetworkResult};
use crate::network::{Network, NetworkResponse};
use crate::station::Station;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Response};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Request correlation ID header
const X_REQUEST_ID: &str = "X-Request-ID";

/// Station feed client with retry on transient failures
#[derive(Clone)]
pub struct CitybikesClient {
    inner: Client,
    config: Arc<ClientConfig>,
}

impl CitybikesClient {
    /// Create a client configured from the environment
    pub fn new() -> NetworkResult<Self> {
        Self::with_config(ClientConfig::from_env()?)
    }

    /// Create a client with specific configuration
    pub fn with_config(config: ClientConfig) -> NetworkResult<Self> {
        config.validate()?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("velo-tools/", env!("CARGO_PKG_VERSION"))),
        );

        let inner = Client::builder()
            .timeout(config.timeout)
            .default_headers(default_headers)
            .build()
            .map_err(NetworkError::Request)?;

        Ok(Self {
            inner,
            config: Arc::new(config),
        })
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetch the configured network with all its stations
    #[instrument(skip(self), fields(network = %self.config.network_id))]
    pub async fn fetch_network(&self) -> NetworkResult<Network> {
        let url = self.config.network_url();
        let response: NetworkResponse = self.get_with_retry(&url).await?;

        debug!(stations = response.network.stations.len(), "Network loaded");
        Ok(response.network)
    }

    /// Fetch the network and pick one station
    ///
    /// Returns [`NetworkError::TargetNotFound`] if the id is not in the network.
    pub async fn fetch_station(&self, id: &str) -> NetworkResult<Station> {
        let network = self.fetch_network().await?;
        network.require_station(id).cloned()
    }

    async fn get_with_retry<T: serde::de::DeserializeOwned>(&self, url: &str) -> NetworkResult<T> {
        let request_id = Uuid::new_v4().to_string();
        let retry = &self.config.retry;
        let mut last_error: Option<NetworkError> = None;

        for attempt in 0..retry.max_attempts {
            if attempt > 0 {
                let delay = retry.delay_for_attempt(attempt);
                debug!(
                    request_id = %request_id,
                    attempt = attempt,
                    delay_ms = delay.as_millis(),
                    "Retrying after delay"
                );
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();
            match self.get_once(&request_id, url).await {
                Ok(value) => {
                    debug!(
                        request_id = %request_id,
                        attempt = attempt + 1,
                        elapsed_ms = start.elapsed().as_millis(),
                        "Request succeeded"
                    );
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt + 1 < retry.max_attempts => {
                    warn!(
                        request_id = %request_id,
                        attempt = attempt + 1,
                        error = %e,
                        "Request failed, will retry"
                    );
                    last_error = Some(e);
                }
                Err(e) => {
                    debug!(
                        request_id = %request_id,
                        attempt = attempt + 1,
                        error = %e,
                        "Request failed, not retrying"
                    );
                    return Err(e);
                }
            }
        }

        Err(NetworkError::RetriesExhausted {
            attempts: retry.max_attempts,
            last_error: last_error.map_or_else(|| "Unknown error".to_string(), |e| e.to_string()),
        })
    }

    async fn get_once<T: serde::de::DeserializeOwned>(&self, request_id: &str, url: &str) -> NetworkResult<T> {
        let response = self
            .inner
            .get(url)
            .header(X_REQUEST_ID, request_id)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(response: Response) -> NetworkResult<T> {
        let status = response.status();

        if status.is_success() {
            let body = response.bytes().await?;
            Ok(serde_json::from_slice(&body)?)
        } else {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(NetworkError::api(status.as_u16(), message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::network::fixtures::VELO_ANTWERPEN;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves the canned `(status, body)` pairs, one per connection, in order.
    async fn serve(responses: Vec<(u16, &'static str)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await.unwrap();

                let reply = format!(
                    "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
        });

        format!("http://{addr}/v2")
    }

    fn quick_retry() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            backoff_multiplier: 2.0,
        }
    }

    #[test]
    fn test_client_creation() {
        assert!(CitybikesClient::with_config(ClientConfig::default()).is_ok());
        assert!(CitybikesClient::with_config(ClientConfig::default().with_base_url("")).is_err());
    }

    #[tokio::test]
    async fn test_fetch_network() {
        let base = serve(vec![(200, VELO_ANTWERPEN)]).await;
        let client = CitybikesClient::with_config(ClientConfig::default().with_base_url(base)).unwrap();

        let network = client.fetch_network().await.unwrap();
        assert_eq!(network.id, "velo-antwerpen");
        assert_eq!(network.stations.len(), 3);
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let base = serve(vec![(503, "busy"), (500, "oops"), (200, VELO_ANTWERPEN)]).await;
        let config = ClientConfig::default().with_base_url(base).with_retry(quick_retry());
        let client = CitybikesClient::with_config(config).unwrap();

        assert!(client.fetch_network().await.is_ok());
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let base = serve(vec![(404, "unknown network")]).await;
        let config = ClientConfig::default().with_base_url(base).with_retry(quick_retry());
        let client = CitybikesClient::with_config(config).unwrap();

        match client.fetch_network().await {
            Err(NetworkError::Api { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "unknown network");
            }
            other => panic!("expected 404, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_missing_station() {
        let base = serve(vec![(200, VELO_ANTWERPEN)]).await;
        let client = CitybikesClient::with_config(ClientConfig::default().with_base_url(base)).unwrap();

        let err = client.fetch_station("nope").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
