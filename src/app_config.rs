use std::default::Default;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::rate_limiter::RateBudget;

/// Top-level configuration, persisted as JSON
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Remote subtitle providers, queried in declaration order
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    /// Retry discipline for provider calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// Search result caching
    #[serde(default)]
    pub cache: CacheConfig,

    /// Playback synchronisation
    #[serde(default)]
    pub sync: SyncConfig,

    /// Charset used when neither the caller nor the server declares one
    #[serde(default = "default_encoding")]
    pub default_encoding: String,
}

/// Subtitle provider endpoint
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProviderConfig {
    // @field: Provider identifier
    pub id: String,

    // @field: Service URL
    pub endpoint: String,

    // @field: Whether the provider takes part in searches
    #[serde(default = "default_true")]
    pub enabled: bool,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Requests allowed per window; None means unlimited
    #[serde(default = "default_rate_limit_requests")]
    pub rate_limit_requests: Option<u32>,

    // @field: Rate limit window in seconds
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,
}

impl ProviderConfig {
    // @param id: Provider identifier
    // @param endpoint: Base URL
    // @returns: Provider config with defaults
    pub fn new(id: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            endpoint: endpoint.into(),
            enabled: default_true(),
            timeout_secs: default_timeout_secs(),
            rate_limit_requests: default_rate_limit_requests(),
            rate_limit_window_secs: default_rate_limit_window_secs(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    // @returns: Rate budget when one is configured
    pub fn rate_budget(&self) -> Option<RateBudget> {
        self.rate_limit_requests
            .map(|requests| RateBudget::new(requests, Duration::from_secs(self.rate_limit_window_secs)))
    }
}

/// Retry configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RetryConfig {
    /// Attempts per call, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay unit; attempt N waits N times this long
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

/// Cache configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CacheConfig {
    /// Lifetime of cached search results
    #[serde(default = "default_search_ttl_secs")]
    pub search_ttl_secs: u64,

    /// Whether caching is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            search_ttl_secs: default_search_ttl_secs(),
            enabled: default_true(),
        }
    }
}

/// Synchronisation configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SyncConfig {
    /// Offset applied to every new synchronizer, in milliseconds
    #[serde(default)]
    pub default_offset_ms: i64,

    /// Number of drift samples kept for diagnostics
    #[serde(default = "default_drift_sample_capacity")]
    pub drift_sample_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_offset_ms: 0,
            drift_sample_capacity: default_drift_sample_capacity(),
        }
    }
}

/// Log level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_rate_limit_requests() -> Option<u32> {
    Some(40)
}

fn default_rate_limit_window_secs() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_search_ttl_secs() -> u64 {
    10 * 60
}

fn default_drift_sample_capacity() -> usize {
    120
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration as pretty JSON, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Default location: `<config dir>/subcue/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("subcue").join("config.json"))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let mut seen = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            if provider.id.trim().is_empty() {
                return Err(anyhow!("Provider id must not be empty"));
            }
            if seen.contains(&provider.id.as_str()) {
                return Err(anyhow!("Duplicate provider id: {}", provider.id));
            }
            seen.push(provider.id.as_str());

            url::Url::parse(&provider.endpoint)
                .with_context(|| format!("Invalid endpoint for provider {}: {}", provider.id, provider.endpoint))?;
            if provider.timeout_secs == 0 {
                return Err(anyhow!("Timeout for provider {} must be positive", provider.id));
            }
            if provider.rate_limit_requests == Some(0) || provider.rate_limit_window_secs == 0 {
                return Err(anyhow!("Rate limit for provider {} must be positive", provider.id));
            }
        }

        if self.retry.max_attempts == 0 {
            return Err(anyhow!("retry.max_attempts must be at least 1"));
        }
        if self.sync.drift_sample_capacity == 0 {
            return Err(anyhow!("sync.drift_sample_capacity must be at least 1"));
        }
        crate::dispatcher::decode(b"", &self.default_encoding)
            .map_err(|e| anyhow!("Invalid default_encoding: {}", e))?;

        Ok(())
    }

    pub fn search_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.search_ttl_secs)
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            log_level: LogLevel::default(),
            providers: Vec::new(),
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
            sync: SyncConfig::default(),
            default_encoding: default_encoding(),
        }
    }
}
