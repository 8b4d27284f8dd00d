//! Workspace configuration.
//!
//! Settings come from a TOML file named by `STRATUS_CONFIG` (default
//! `config.toml`), every section optional. The database URL can be
//! overridden with `STRATUS_DATABASE_URL` so credentials stay out of
//! checked-in files. A bad strategy name fails at load, before any write.

use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stratus_core::{Strategy, UnknownStrategy};

const DEFAULT_DATABASE_URL: &str = "mysql://stratus@localhost/stratus";
const DEFAULT_MAX_ATTEMPTS: u32 = 4;
const DEFAULT_BASE_DELAY_MS: u64 = 250;
const DEFAULT_MAX_DELAY_MS: u64 = 5_000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Strategy(#[from] UnknownStrategy),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Strategy name: `raw`, `normalized`, or `hybrid`.
    pub strategy: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: Option<DatabaseConfig>,
    pub storage: Option<StorageConfig>,
    pub retry: Option<RetryConfig>,
}

impl AppConfig {
    /// Load from the path named by `STRATUS_CONFIG`, defaulting to
    /// `config.toml` in the working directory.
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var("STRATUS_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from(path)
    }

    /// Load from an explicit path. A missing file yields the defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = if path.exists() {
            toml::from_str(&fs::read_to_string(path)?)?
        } else {
            Self::default()
        };
        // Reject a misspelled strategy now rather than mid-run.
        config.strategy()?;
        Ok(config)
    }

    /// Database URL. `STRATUS_DATABASE_URL` beats the file, which beats
    /// the local default.
    pub fn database_url(&self) -> String {
        std::env::var("STRATUS_DATABASE_URL")
            .ok()
            .or_else(|| self.database.as_ref().and_then(|db| db.url.clone()))
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
    }

    /// The configured persistence strategy, defaulting to hybrid.
    pub fn strategy(&self) -> Result<Strategy, ConfigError> {
        match self.storage.as_ref().and_then(|s| s.strategy.as_deref()) {
            Some(name) => Ok(Strategy::from_str(name)?),
            None => Ok(Strategy::Hybrid),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.retry
            .as_ref()
            .and_then(|r| r.max_attempts)
            .unwrap_or(DEFAULT_MAX_ATTEMPTS)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(
            self.retry
                .as_ref()
                .and_then(|r| r.base_delay_ms)
                .unwrap_or(DEFAULT_BASE_DELAY_MS),
        )
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(
            self.retry
                .as_ref()
                .and_then(|r| r.max_delay_ms)
                .unwrap_or(DEFAULT_MAX_DELAY_MS),
        )
    }
}
