//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - A typed failure taxonomy for weather lookups
//! - Abstraction over weather sources (HTTP API, in-process simulation)
//! - Bounded retry with exponential backoff under an overall deadline
//! - A TTL cache with single-flight loading
//! - Concurrent multi-city reports
//! - Configuration handling
//!
//! Lookups flow report → cache → retry → source; each layer only calls the
//! one beneath it.
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod report;
pub mod retry;
pub mod source;

#[cfg(test)]
mod test_support;

pub use cache::{CacheSettings, WeatherCache};
pub use config::{CacheConfig, Config, RetryConfig, SourceConfig};
pub use error::{FetchError, PolicyError};
pub use model::WeatherData;
pub use report::{DEFAULT_CITIES, city_report, multi_city_report};
pub use retry::{ResilientFetcher, RetryHook, RetryNotice, RetryPolicy, resilient_fetch};
pub use source::{SourceKind, WeatherSource, source_from_config};

/// Wire the configured source, retry policy and cache together.
pub fn cache_from_config(config: &Config) -> anyhow::Result<WeatherCache> {
    let source = source_from_config(config)?;
    let fetcher = ResilientFetcher::new(source, config.retry_policy()?);
    Ok(WeatherCache::new(config.cache_settings()?, fetcher))
}
