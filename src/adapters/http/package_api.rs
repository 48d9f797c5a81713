use super::{build_client, RetryPolicy};
use crate::config::toml_config::PackageSourceConfig;
use crate::domain::model::PackageRecord;
use crate::domain::ports::PackageSource;
use crate::utils::error::{Result, TrackerError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};

const SOURCE_NAME: &str = "package source";

/// Client for the carrier status API: `GET {base_url}/{tracking_number}`.
pub struct PackageApiClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl PackageApiClient {
    pub fn new(config: &PackageSourceConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_seconds())?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry: config.retry_policy(),
        })
    }

    fn endpoint(&self, tracking_number: &str) -> String {
        format!("{}/{}", self.base_url, tracking_number)
    }
}

#[async_trait]
impl PackageSource for PackageApiClient {
    async fn fetch(&self, tracking_number: &str) -> Result<Option<PackageRecord>> {
        let url = self.endpoint(tracking_number);
        tracing::debug!("Making package API request to: {}", url);

        let response = self.retry.send(SOURCE_NAME, || self.client.get(&url)).await?;
        let status = response.status();
        tracing::debug!("Package API response status: {}", status);

        if status == StatusCode::NOT_FOUND || status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(TrackerError::external(
                SOURCE_NAME,
                format!("unexpected status {}", status),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| TrackerError::external(SOURCE_NAME, e.to_string()))?;
        let trimmed = body.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Ok(None);
        }

        let mut record: PackageRecord = serde_json::from_str(trimmed).map_err(|e| {
            TrackerError::external(SOURCE_NAME, format!("malformed response: {}", e))
        })?;

        // The requested number is the record's identity in the local store.
        if record.tracking_number != tracking_number {
            if !record.tracking_number.is_empty() {
                tracing::debug!(
                    "Package API echoed {} for {}, keeping the requested number",
                    record.tracking_number,
                    tracking_number
                );
            }
            record.tracking_number = tracking_number.to_string();
        }

        Ok(Some(record))
    }
}
