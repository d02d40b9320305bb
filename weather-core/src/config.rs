use anyhow::{Context, Result, anyhow, ensure};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{cache::CacheSettings, retry::RetryPolicy, source::SourceKind};

/// Where weather comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Source kind, e.g. "http" or "simulated".
    pub kind: String,

    /// Base URL of the weather API, used by the "http" source.
    pub base_url: String,

    /// Probability of an injected server error, used by the "simulated" source.
    pub failure_rate: f64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Http.to_string(),
            base_url: "http://localhost:4000".to_string(),
            failure_rate: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: usize,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            ttl_secs: 15 * 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub base_delay_ms: u64,
    pub max_attempts: u32,
    pub overall_timeout_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_attempts: 4,
            overall_timeout_ms: 10_000,
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// [source]
/// kind = "http"
/// base_url = "http://localhost:4000"
///
/// [cache]
/// capacity = 100
/// ttl_secs = 900
///
/// [retry]
/// base_delay_ms = 1000
/// max_attempts = 4
/// overall_timeout_ms = 10000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub cache: CacheConfig,
    pub retry: RetryConfig,
}

impl Config {
    /// Return the configured source as a strongly-typed SourceKind.
    pub fn source_kind(&self) -> Result<SourceKind> {
        SourceKind::try_from(self.source.kind.as_str())
    }

    pub fn set_source_kind(&mut self, kind: SourceKind) {
        self.source.kind = kind.as_str().to_string();
    }

    pub fn retry_policy(&self) -> Result<RetryPolicy> {
        RetryPolicy::new(
            Duration::from_millis(self.retry.base_delay_ms),
            self.retry.max_attempts,
            Duration::from_millis(self.retry.overall_timeout_ms),
        )
        .context("Invalid [retry] configuration")
    }

    pub fn cache_settings(&self) -> Result<CacheSettings> {
        CacheSettings::new(self.cache.capacity, Duration::from_secs(self.cache.ttl_secs))
            .context("Invalid [cache] configuration")
    }

    /// Check every setting against its allowed range.
    pub fn validate(&self) -> Result<()> {
        self.source_kind()?;
        ensure!(
            (0.0..=1.0).contains(&self.source.failure_rate),
            "Invalid [source] configuration: failure_rate must be between 0 and 1, got {}",
            self.source.failure_rate
        );
        self.retry_policy()?;
        self.cache_settings()?;
        Ok(())
    }

    /// Load config from the default location, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, use defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        cfg.validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the default location, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-task", "weather-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
