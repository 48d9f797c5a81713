pub mod package_api;
pub mod weather_api;

pub use package_api::PackageApiClient;
pub use weather_api::WeatherApiClient;

use crate::utils::error::{Result, TrackerError};
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;

/// Retry policy shared by the provider clients. `retries` counts the extra
/// attempts after the first one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Sends the request built by `build`, retrying transport errors and 5xx
    /// responses. Any other response is handed back for the caller to judge.
    pub async fn send<F>(&self, source_name: &str, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match build().send().await {
                Ok(response) if response.status().is_server_error() && attempt <= self.retries => {
                    tracing::warn!(
                        "🔄 {} returned {} (attempt {}/{}), retrying",
                        source_name,
                        response.status(),
                        attempt,
                        self.retries + 1
                    );
                }
                Ok(response) => return Ok(response),
                Err(e) if attempt <= self.retries => {
                    tracing::warn!(
                        "🔄 {} request failed (attempt {}/{}): {}",
                        source_name,
                        attempt,
                        self.retries + 1,
                        e
                    );
                }
                Err(e) => return Err(TrackerError::external(source_name, e.to_string())),
            }
            tokio::time::sleep(self.delay).await;
        }
    }
}

pub(crate) fn build_client(timeout_seconds: u64) -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_retry_gives_up_after_configured_attempts() {
        let server = MockServer::start();
        let failing = server.mock(|when, then| {
            when.method(GET).path("/flaky");
            then.status(503);
        });

        let policy = RetryPolicy {
            retries: 2,
            delay: Duration::from_millis(1),
        };
        let client = Client::new();
        let url = server.url("/flaky");
        let response = policy.send("test", || client.get(&url)).await.unwrap();

        assert_eq!(response.status().as_u16(), 503);
        failing.assert_hits(3);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let server = MockServer::start();
        let missing = server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404);
        });

        let policy = RetryPolicy {
            retries: 3,
            delay: Duration::from_millis(1),
        };
        let client = Client::new();
        let url = server.url("/missing");
        let response = policy.send("test", || client.get(&url)).await.unwrap();

        assert_eq!(response.status().as_u16(), 404);
        missing.assert_hits(1);
    }
}
