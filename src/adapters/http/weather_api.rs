use super::{build_client, RetryPolicy};
use crate::config::toml_config::WeatherConfig;
use crate::domain::ports::WeatherSource;
use crate::utils::error::{Result, TrackerError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

const SOURCE_NAME: &str = "weather";

#[derive(Debug, Deserialize)]
struct CurrentWeatherResponse {
    current: CurrentConditions,
}

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    temp_c: f64,
}

/// weatherapi.com style client: `GET {base_url}/current.json?key=..&q=..`.
pub struct WeatherApiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl WeatherApiClient {
    pub fn new(config: &WeatherConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_seconds())?,
            base_url: config.base_url().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            retry: config.retry_policy(),
        })
    }
}

#[async_trait]
impl WeatherSource for WeatherApiClient {
    async fn current_temperature(&self, location: &str) -> Result<f64> {
        let url = format!("{}/current.json", self.base_url);
        tracing::debug!("Requesting current weather for {}", location);

        let response = self
            .retry
            .send(SOURCE_NAME, || {
                let mut request = self.client.get(&url).query(&[("q", location)]);
                if let Some(key) = &self.api_key {
                    request = request.query(&[("key", key.as_str())]);
                }
                request
            })
            .await?;

        if !response.status().is_success() {
            return Err(TrackerError::external(
                SOURCE_NAME,
                format!("unexpected status {}", response.status()),
            ));
        }

        let parsed: CurrentWeatherResponse = response
            .json()
            .await
            .map_err(|e| TrackerError::external(SOURCE_NAME, format!("malformed response: {}", e)))?;

        Ok(parsed.current.temp_c)
    }
}
