//! Configuration management for Quotecast

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::formatter::MAX_POST_LENGTH;
use crate::publisher::RetryPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub post: PostConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: String,
    pub table: String,
    pub text_column: String,
    pub author_column: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "~/.local/share/quotecast/quotes.db".to_string(),
            table: "quotes".to_string(),
            text_column: "text".to_string(),
            author_column: "author".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    pub path: String,
    pub daily_limit: u32,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            path: "~/.local/share/quotecast/quota.txt".to_string(),
            daily_limit: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostConfig {
    pub max_length: usize,
}

impl Default for PostConfig {
    fn default() -> Self {
        Self {
            max_length: MAX_POST_LENGTH,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_rate_limit_retries: u32,
    pub max_wait_secs: u64,
    pub fallback_wait_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_rate_limit_retries: 5,
            max_wait_secs: 900,
            fallback_wait_secs: 60,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_rate_limit_retries: self.max_rate_limit_retries,
            max_wait: Duration::from_secs(self.max_wait_secs),
            fallback_wait: Duration::from_secs(self.fallback_wait_secs),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.twitter.com".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load configuration from the default location
    ///
    /// A missing file is not an error; the defaults are used instead.
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        if !config_path.exists() {
            tracing::debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default_config());
        }
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            store: StoreConfig::default(),
            quota: QuotaConfig::default(),
            post: PostConfig::default(),
            retry: RetryConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

/// Expand `~` in a configured path
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("QUOTECAST_CONFIG") {
        return Ok(expand_path(&path));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("quotecast").join("config.toml"))
}
