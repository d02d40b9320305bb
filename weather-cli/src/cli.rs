use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use inquire::{CustomType, Select, Text};
use tracing::{debug, info};
use weather_core::{
    Config, DEFAULT_CITIES, SourceKind, cache_from_config, city_report, multi_city_report,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather CLI")]
pub struct Cli {
    /// Read configuration from this file instead of the default location.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Use the in-process simulated source regardless of configuration.
    #[arg(long, global = true)]
    pub simulate: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactively edit and save the configuration.
    Configure,

    /// Show temperatures for several cities at once.
    Report {
        /// City names; defaults to London, New York, Tokyo, Sydney and Paris.
        cities: Vec<String>,
    },

    /// Show full conditions for one city.
    Show {
        /// City name.
        city: String,
    },

    /// Print the location of the configuration file.
    ConfigPath,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match &self.command {
            Command::Configure => {
                let path = self.config_path()?;
                let current = Config::load_from(&path)?;
                let updated = prompt_config(current)?;
                updated.save_to(&path)?;
                println!("Configuration saved to {}", path.display());
            }
            Command::Report { cities } => {
                let config = self.effective_config()?;
                let cache = cache_from_config(&config)?;

                let report = if cities.is_empty() {
                    multi_city_report(&cache, DEFAULT_CITIES).await
                } else {
                    multi_city_report(&cache, cities.as_slice()).await
                };
                println!("{report}");
            }
            Command::Show { city } => {
                let config = self.effective_config()?;
                let cache = cache_from_config(&config)?;
                println!("{}", city_report(&cache, city).await);
            }
            Command::ConfigPath => {
                println!("{}", self.config_path()?.display());
            }
        }

        Ok(())
    }

    fn config_path(&self) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => Config::config_file_path(),
        }
    }

    fn effective_config(&self) -> Result<Config> {
        let path = self.config_path()?;
        debug!(path = %path.display(), "loading configuration");

        let mut config = Config::load_from(&path)?;
        if self.simulate {
            config.set_source_kind(SourceKind::Simulated);
        }

        info!(
            source = %config.source.kind,
            max_attempts = config.retry.max_attempts,
            ttl_secs = config.cache.ttl_secs,
            "configuration loaded"
        );
        Ok(config)
    }
}

fn prompt_config(mut config: Config) -> Result<Config> {
    let kinds: Vec<&str> = SourceKind::all().iter().map(SourceKind::as_str).collect();
    let start = config
        .source_kind()
        .ok()
        .and_then(|current| SourceKind::all().iter().position(|kind| *kind == current));

    let kind = Select::new("Weather source:", kinds)
        .with_starting_cursor(start.unwrap_or(0))
        .prompt()
        .context("Failed to read source kind")?;
    config.source.kind = kind.to_string();

    match config.source_kind()? {
        SourceKind::Http => {
            let base_url = Text::new("Weather API base URL:")
                .with_default(&config.source.base_url)
                .prompt()
                .context("Failed to read base URL")?;
            config.source.base_url = base_url;
        }
        SourceKind::Simulated => {
            config.source.failure_rate = CustomType::<f64>::new("Simulated failure rate (0-1):")
                .with_default(config.source.failure_rate)
                .prompt()
                .context("Failed to read failure rate")?;
        }
    }

    config.cache.capacity = CustomType::<usize>::new("Cache capacity (entries):")
        .with_default(config.cache.capacity)
        .prompt()
        .context("Failed to read cache capacity")?;
    config.cache.ttl_secs = CustomType::<u64>::new("Cache TTL (seconds):")
        .with_default(config.cache.ttl_secs)
        .prompt()
        .context("Failed to read cache TTL")?;
    config.retry.base_delay_ms = CustomType::<u64>::new("Retry base delay (ms):")
        .with_default(config.retry.base_delay_ms)
        .prompt()
        .context("Failed to read base delay")?;
    config.retry.max_attempts = CustomType::<u32>::new("Maximum attempts:")
        .with_default(config.retry.max_attempts)
        .prompt()
        .context("Failed to read maximum attempts")?;
    config.retry.overall_timeout_ms = CustomType::<u64>::new("Overall timeout (ms):")
        .with_default(config.retry.overall_timeout_ms)
        .prompt()
        .context("Failed to read overall timeout")?;

    config.validate()?;
    Ok(config)
}
