use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::{FetchError, WeatherData};

use super::WeatherSource;

/// Weather API reachable at `GET {base_url}/weather?city=<city>`.
#[derive(Debug, Clone)]
pub struct HttpWeatherSource {
    base_url: String,
    http: Client,
}

impl HttpWeatherSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("weather-core/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client for weather source")?;

        Ok(Self::with_client(base_url, http))
    }

    pub fn with_client(base_url: impl Into<String>, http: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, http }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl WeatherSource for HttpWeatherSource {
    async fn fetch_one(&self, city: &str) -> Result<WeatherData, FetchError> {
        let url = format!("{}/weather", self.base_url);
        debug!(city, %url, "requesting weather");

        let res = self.http.get(&url).query(&[("city", city)]).send().await?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| FetchError::network(format!("Failed to read response body: {e}")))?;

        if !status.is_success() {
            let message = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                truncate_body(&body)
            };
            return Err(FetchError::api(status.as_u16(), message));
        }

        let data: WeatherData = serde_json::from_str(&body).map_err(|e| {
            FetchError::api(status.as_u16(), format!("malformed weather payload: {e}"))
        })?;
        data.check_ranges().map_err(|reason| {
            FetchError::api(status.as_u16(), format!("malformed weather payload: {reason}"))
        })?;

        Ok(data)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
