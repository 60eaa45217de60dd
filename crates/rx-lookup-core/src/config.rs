//! Runtime configuration.
//!
//! Every key is optional; missing keys fall back to [`LookupConfig::default`].
//!
//! ```toml
//! cache_path = "data/lookup_cache.db"
//! log_filter = "rx_lookup_core=debug"
//!
//! [catalog]
//! base_url = "https://rxnav.nlm.nih.gov/REST"
//!
//! [http]
//! timeout_secs = 10
//! max_attempts = 3
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LookupConfig {
    /// SQLite cache file
    pub cache_path: PathBuf,
    /// Default tracing filter; `RUST_LOG` overrides it
    pub log_filter: String,
    pub catalog: CatalogConfig,
    pub label: LabelConfig,
    pub http: HttpConfig,
    pub matcher: MatcherConfig,
}

/// Remote drug-product catalog (RxNav).
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: String,
}

/// Remote drug-label database (openFDA).
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LabelConfig {
    pub endpoint: String,
}

/// Outbound request policy shared by both remote clients.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    /// Total attempts including the first
    pub max_attempts: u32,
    /// First retry delay; doubles on each further retry
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub user_agent: String,
}

/// Fuzzy product matching.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct MatcherConfig {
    /// Products scoring below this are excluded (0.0 - 1.0)
    pub threshold: f64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            cache_path: PathBuf::from("data/lookup_cache.db"),
            log_filter: "info".into(),
            catalog: CatalogConfig::default(),
            label: LabelConfig::default(),
            http: HttpConfig::default(),
            matcher: MatcherConfig::default(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://rxnav.nlm.nih.gov/REST".into(),
        }
    }
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.fda.gov/drug/label.json".into(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_attempts: 3,
            backoff_base_ms: 1000,
            backoff_max_ms: 8000,
            user_agent: concat!("rx-lookup/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            threshold: crate::resolver::DEFAULT_MATCH_THRESHOLD,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl LookupConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(raw: &str) -> ConfigResult<Self> {
        let config: LookupConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.catalog.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "catalog.base_url",
                reason: "must not be empty".into(),
            });
        }
        if self.label.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "label.endpoint",
                reason: "must not be empty".into(),
            });
        }
        if self.http.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "http.max_attempts",
                reason: "must be at least 1".into(),
            });
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "http.timeout_secs",
                reason: "must be at least 1".into(),
            });
        }
        if !(self.matcher.threshold > 0.0 && self.matcher.threshold <= 1.0) {
            return Err(ConfigError::Invalid {
                key: "matcher.threshold",
                reason: format!("{} is outside (0, 1]", self.matcher.threshold),
            });
        }
        Ok(())
    }
}
