//! Configuration management for playscout.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main collector configuration.
///
/// This is loaded from `~/.config/playscout/config.toml` (or platform equivalent),
/// or from an explicit path. Missing sections and fields fall back to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Store endpoint and locale settings
    pub store: PlayStoreConfig,
    /// Retry and backoff settings
    pub retry: RetryConfig,
    /// Proxy source and rotation settings
    pub proxy: ProxyConfig,
    /// Detail enrichment concurrency settings
    pub dispatch: DispatchConfig,
    /// Search stage settings
    pub search: SearchConfig,
    /// Output settings
    pub output: OutputConfig,
}

impl ScraperConfig {
    /// Load configuration from the default location, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file path.
    ///
    /// Unlike [`ScraperConfig::load`], a missing file is an error here.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }

        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    ///
    /// Supports the following environment variables:
    /// - `PLAYSCOUT_LANG`, `PLAYSCOUT_COUNTRY`: store locale
    /// - `PLAYSCOUT_BASE_URL`: store base URL
    /// - `PLAYSCOUT_MAX_ATTEMPTS`: retry budget per operation
    /// - `PLAYSCOUT_PROXY_FILE`: proxy list path
    /// - `PLAYSCOUT_MAX_WORKERS`: detail fetch concurrency
    /// - `PLAYSCOUT_OUTPUT_DIR`: default output directory
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides using an arbitrary variable lookup.
    ///
    /// Unparseable numeric values are ignored with a warning.
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(lang) = lookup("PLAYSCOUT_LANG") {
            tracing::debug!("Override store.lang from env: {}", lang);
            self.store.lang = lang;
        }

        if let Some(country) = lookup("PLAYSCOUT_COUNTRY") {
            tracing::debug!("Override store.country from env: {}", country);
            self.store.country = country;
        }

        if let Some(base_url) = lookup("PLAYSCOUT_BASE_URL") {
            tracing::debug!("Override store.base_url from env: {}", base_url);
            self.store.base_url = base_url;
        }

        if let Some(val) = lookup("PLAYSCOUT_MAX_ATTEMPTS") {
            match val.parse() {
                Ok(attempts) => {
                    self.retry.max_attempts = attempts;
                    tracing::debug!("Override retry.max_attempts from env: {}", attempts);
                }
                Err(_) => tracing::warn!("Ignoring invalid PLAYSCOUT_MAX_ATTEMPTS: {}", val),
            }
        }

        if let Some(file) = lookup("PLAYSCOUT_PROXY_FILE") {
            tracing::debug!("Override proxy.file from env: {}", file);
            self.proxy.file = PathBuf::from(file);
        }

        if let Some(val) = lookup("PLAYSCOUT_MAX_WORKERS") {
            match val.parse() {
                Ok(workers) => {
                    self.dispatch.max_workers = workers;
                    tracing::debug!("Override dispatch.max_workers from env: {}", workers);
                }
                Err(_) => tracing::warn!("Ignoring invalid PLAYSCOUT_MAX_WORKERS: {}", val),
            }
        }

        if let Some(dir) = lookup("PLAYSCOUT_OUTPUT_DIR") {
            tracing::debug!("Override output.dir from env: {}", dir);
            self.output.dir = PathBuf::from(dir);
        }

        self
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.dispatch.max_workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "dispatch.max_workers".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.retry.jitter_min_ms > self.retry.jitter_max_ms {
            return Err(ConfigError::InvalidValue {
                field: "retry.jitter_min_ms".to_string(),
                reason: format!(
                    "must not exceed retry.jitter_max_ms ({} > {})",
                    self.retry.jitter_min_ms, self.retry.jitter_max_ms
                ),
            });
        }

        if self.store.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "store.base_url".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/playscout/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "playscout", "playscout").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// Store endpoint and locale settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayStoreConfig {
    /// Base URL of the store front
    pub base_url: String,
    /// Query suggestion endpoint
    pub suggest_url: String,
    /// Interface language (`hl`)
    pub lang: String,
    /// Storefront country (`gl`)
    pub country: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for PlayStoreConfig {
    fn default() -> Self {
        Self {
            base_url: "https://play.google.com".to_string(),
            suggest_url: "https://market.android.com/suggest/SuggRequest".to_string(),
            lang: "en".to_string(),
            country: "us".to_string(),
            request_timeout_secs: 30,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
                         Chrome/124.0 Safari/537.36"
                .to_string(),
        }
    }
}

/// Backoff schedule between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    /// Same delay before every retry
    Fixed,
    /// Delay doubles after every failed attempt
    Exponential,
}

/// Retry and backoff settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum attempts per operation (0 and 1 both mean a single attempt)
    pub max_attempts: u32,
    /// Backoff schedule
    pub backoff: BackoffKind,
    /// Base delay in whole seconds
    pub initial_backoff_secs: u64,
    /// Lower bound of random jitter added to each delay
    pub jitter_min_ms: u64,
    /// Upper bound of random jitter added to each delay
    pub jitter_max_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: BackoffKind::Exponential,
            initial_backoff_secs: 6,
            jitter_min_ms: 2000,
            jitter_max_ms: 5000,
        }
    }
}

/// Order in which proxy endpoints are handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationStrategy {
    /// Cycle through the list in file order
    RoundRobin,
    /// Pick uniformly among eligible endpoints
    Random,
}

/// Proxy source and rotation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Plain-text file with one `host:port` per line
    pub file: PathBuf,
    /// Rotation order
    pub rotation: RotationStrategy,
    /// Failures after which an endpoint is skipped for the rest of the run (0 = never)
    pub max_failures: u32,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("good_proxies.txt"),
            rotation: RotationStrategy::Random,
            max_failures: 3,
        }
    }
}

/// Detail enrichment concurrency settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Maximum in-flight detail fetches
    pub max_workers: usize,
    /// Optional wall-clock limit for the whole enrichment phase
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_workers: 18,
            timeout_secs: None,
        }
    }
}

/// Search stage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Extra hits requested per search beyond the per-query cap
    pub hits_buffer: usize,
    /// Pause between consecutive search terms in milliseconds
    pub delay_between_terms_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            hits_buffer: 0,
            delay_between_terms_ms: 1000,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory used when no explicit output path is given
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("scraped_app_data"),
        }
    }
}
