use crate::{
    Config, FetchError, WeatherData,
    source::{http::HttpWeatherSource, simulated::SimulatedWeatherSource},
};
use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug, sync::Arc};

pub mod http;
pub mod simulated;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Http,
    Simulated,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Http => "http",
            SourceKind::Simulated => "simulated",
        }
    }

    pub const fn all() -> &'static [SourceKind] {
        &[SourceKind::Http, SourceKind::Simulated]
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for SourceKind {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "http" => Ok(SourceKind::Http),
            "simulated" => Ok(SourceKind::Simulated),
            _ => Err(anyhow::anyhow!(
                "Unknown source kind '{value}'. Supported kinds: http, simulated."
            )),
        }
    }
}

/// A remote place weather can be read from.
///
/// Implementations make exactly one attempt per call and never retry or
/// enforce deadlines themselves; every failure comes back as a [`FetchError`].
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    async fn fetch_one(&self, city: &str) -> Result<WeatherData, FetchError>;

    fn name(&self) -> &'static str;
}

/// Construct the source selected by `config.source.kind`.
pub fn source_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherSource>> {
    let source: Arc<dyn WeatherSource> = match config.source_kind()? {
        SourceKind::Http => Arc::new(HttpWeatherSource::new(config.source.base_url.clone())?),
        SourceKind::Simulated => {
            Arc::new(SimulatedWeatherSource::new(config.source.failure_rate)?)
        }
    };

    Ok(source)
}
