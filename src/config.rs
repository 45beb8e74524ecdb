//! Client configuration loaded from `~/.config/livelay/config.toml`.
//!
//! Every key is optional; missing keys fall back to defaults. The
//! `LIVELAY_API_URL` environment variable overrides `api.base_url`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Environment variable overriding [`ApiConfig::base_url`].
pub const API_URL_ENV: &str = "LIVELAY_API_URL";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub polling: PollingConfig,
    pub playback: PlaybackConfig,
}

/// Backend location and HTTP timeouts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API base, including any `/api` suffix.
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// Lower bound on the readiness poll interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Readiness polling after a stream start.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_ms: u64,
    /// Give up waiting for the manifest after this long; `0` waits forever.
    pub ready_timeout_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            ready_timeout_secs: 120,
        }
    }
}

impl PollingConfig {
    /// Never shorter than [`MIN_POLL_INTERVAL`].
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms).max(MIN_POLL_INTERVAL)
    }

    #[must_use]
    pub fn ready_timeout(&self) -> Option<Duration> {
        (self.ready_timeout_secs > 0).then(|| Duration::from_secs(self.ready_timeout_secs))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub attach_timeout_secs: u64,
    /// 0..=100
    pub initial_volume: u8,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            attach_timeout_secs: 15,
            initial_volume: 75,
        }
    }
}

impl PlaybackConfig {
    #[must_use]
    pub fn attach_timeout(&self) -> Duration {
        Duration::from_secs(self.attach_timeout_secs)
    }
}

impl Config {
    /// Load from the default location, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&config_path())?;
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                config.api.base_url = url;
            }
        }
        Ok(config)
    }

    /// Load from `path`; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        toml::from_str(&content).with_context(|| format!("invalid TOML in {}", path.display()))
    }
}

/// Return the path to the config file.
#[must_use]
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("livelay")
        .join("config.toml")
}
