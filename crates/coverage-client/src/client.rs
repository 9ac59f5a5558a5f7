//! The shared backend HTTP client with bounded retry.

use std::time::{Duration, Instant};

use futures::future::join_all;
use metrics::{counter, histogram};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::FetchError;

/// Retry and timeout configuration for backend fetches.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Maximum number of retry attempts after the first try.
    pub max_retries: u32,
    /// Initial retry delay (doubles each retry).
    pub initial_retry_delay: Duration,
    /// Maximum retry delay.
    pub max_retry_delay: Duration,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Connect timeout.
    pub connect_timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_retry_delay: Duration::from_millis(500),
            max_retry_delay: Duration::from_secs(8),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// The shared client for all outbound backend calls.
///
/// One pooled `reqwest::Client` is reused across requests; reqwest clients
/// are safe for concurrent use, so no locking is needed at this layer.
#[derive(Debug, Clone)]
pub struct CoverageClient {
    client: Client,
    config: FetchConfig,
}

impl CoverageClient {
    /// Build the client from a fetch configuration.
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(8)
            .build()
            .map_err(|e| FetchError::Decode(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Fetch a URL and parse the body as JSON, retrying transient failures.
    ///
    /// Connect errors, timeouts, and 5xx responses are retried with
    /// exponential backoff up to `max_retries`; 4xx responses are not,
    /// since repeating a bad request cannot help.
    pub async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        let started = Instant::now();
        let result = self.get_json_inner(url).await;

        let outcome = if result.is_ok() { "ok" } else { "error" };
        counter!("backend_fetch_total", "outcome" => outcome).increment(1);
        histogram!("backend_fetch_duration_seconds").record(started.elapsed().as_secs_f64());

        result
    }

    async fn get_json_inner(&self, url: &str) -> Result<Value, FetchError> {
        let mut delay = self.config.initial_retry_delay;
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let (timed_out, message) = match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .json::<Value>()
                            .await
                            .map_err(|e| FetchError::Decode(e.to_string()));
                    }
                    if !should_retry_status(status.as_u16()) {
                        return Err(FetchError::Status {
                            status: status.as_u16(),
                            url: url.to_string(),
                        });
                    }
                    (false, format!("backend returned {}", status))
                }
                Err(e) if e.is_timeout() => (true, e.to_string()),
                Err(e) => (false, e.to_string()),
            };

            if attempt > self.config.max_retries {
                return Err(if timed_out {
                    FetchError::Timeout {
                        attempts: attempt,
                        message,
                    }
                } else {
                    FetchError::Unavailable {
                        attempts: attempt,
                        message,
                    }
                });
            }

            warn!(
                url = %url,
                attempt,
                max_retries = self.config.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %message,
                "Backend fetch failed, retrying"
            );
            counter!("backend_fetch_retries_total").increment(1);

            tokio::time::sleep(delay).await;
            delay = next_delay(delay, self.config.max_retry_delay);
        }
    }

    /// Fetch several URLs concurrently.
    ///
    /// Results come back in input order; callers merge by key, so arrival
    /// order never matters.
    pub async fn get_json_all(&self, urls: &[String]) -> Vec<Result<Value, FetchError>> {
        debug!(count = urls.len(), "Fanning out backend fetches");
        join_all(urls.iter().map(|url| self.get_json(url))).await
    }
}

/// Whether a response status is worth retrying.
fn should_retry_status(status: u16) -> bool {
    status >= 500
}

/// Exponential backoff: double the delay, capped at `max`.
fn next_delay(current: Duration, max: Duration) -> Duration {
    std::cmp::min(current * 2, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_only_on_server_errors() {
        assert!(should_retry_status(500));
        assert!(should_retry_status(502));
        assert!(should_retry_status(503));
        assert!(!should_retry_status(400));
        assert!(!should_retry_status(404));
        assert!(!should_retry_status(422));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let max = Duration::from_secs(8);
        let mut delay = Duration::from_millis(500);

        delay = next_delay(delay, max);
        assert_eq!(delay, Duration::from_secs(1));
        delay = next_delay(delay, max);
        assert_eq!(delay, Duration::from_secs(2));
        delay = next_delay(delay, max);
        delay = next_delay(delay, max);
        assert_eq!(delay, Duration::from_secs(8));
        delay = next_delay(delay, max);
        assert_eq!(delay, Duration::from_secs(8));
    }

    #[test]
    fn test_default_config_is_bounded() {
        let config = FetchConfig::default();
        assert!(config.max_retries <= 5);
        assert!(config.initial_retry_delay < config.max_retry_delay);
    }

    #[tokio::test]
    async fn test_unreachable_backend_exhausts_retries() {
        // A port nothing listens on: every attempt is a connect error.
        let config = FetchConfig {
            max_retries: 1,
            initial_retry_delay: Duration::from_millis(1),
            max_retry_delay: Duration::from_millis(2),
            request_timeout: Duration::from_millis(500),
            connect_timeout: Duration::from_millis(200),
        };
        let client = CoverageClient::new(config).unwrap();

        let result = client.get_json("http://127.0.0.1:9/ows").await;
        match result {
            Err(FetchError::Unavailable { attempts, .. }) => assert_eq!(attempts, 2),
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }
}
