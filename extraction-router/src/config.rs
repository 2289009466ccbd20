//! Configuration management for the extraction router.
//!
//! Loads configuration from TOML files and provides runtime defaults.

use crate::drift::{default_landmarks, DEFAULT_STORAGE_KEY};
use crate::rate_limiter::RateLimiterConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub scroll: ScrollConfig,

    #[serde(default)]
    pub drift: DriftConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Whether the router is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Bucket capacity
    #[serde(default = "default_max_tokens")]
    pub max_tokens: f64,

    /// Tokens regained per millisecond
    #[serde(default = "default_refill_rate")]
    pub refill_rate_per_ms: f64,

    /// Time between mandatory cooldowns (0 disables them)
    #[serde(default = "default_pause_interval")]
    pub pause_interval_ms: u64,

    /// Shortest cooldown
    #[serde(default = "default_pause_min")]
    pub pause_min_ms: u64,

    /// Longest cooldown
    #[serde(default = "default_pause_max")]
    pub pause_max_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            refill_rate_per_ms: default_refill_rate(),
            pause_interval_ms: default_pause_interval(),
            pause_min_ms: default_pause_min(),
            pause_max_ms: default_pause_max(),
        }
    }
}

impl RateLimitConfig {
    /// Limiter parameters. Capacity is at least one token so a session can
    /// always make progress.
    pub fn limiter_config(&self) -> RateLimiterConfig {
        RateLimiterConfig {
            max_tokens: self.max_tokens.max(1.0),
            refill_rate: self.refill_rate_per_ms.max(0.0),
            pause_interval_ms: self.pause_interval_ms,
            pause_min_ms: self.pause_min_ms,
            pause_max_ms: self.pause_max_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollConfig {
    /// Nominal pixels per scroll
    #[serde(default = "default_distance")]
    pub distance_px: f64,

    /// Most scrolls per session
    #[serde(default = "default_max_scrolls")]
    pub max_scrolls: u32,

    /// Consecutive rounds without new messages that end a session
    #[serde(default = "default_idle_rounds")]
    pub idle_rounds: u32,

    /// Wait between limiter polls when refused
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            distance_px: default_distance(),
            max_scrolls: default_max_scrolls(),
            idle_rounds: default_idle_rounds(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftConfig {
    /// Selectors probed for the layout fingerprint, in order
    #[serde(default = "default_landmarks")]
    pub landmarks: Vec<String>,

    /// Key the fingerprint is stored under
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Fingerprint database; defaults to the user data directory
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            landmarks: default_landmarks(),
            storage_key: default_storage_key(),
            database_path: None,
        }
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_tokens() -> f64 {
    10.0
}

fn default_refill_rate() -> f64 {
    0.0005
}

fn default_pause_interval() -> u64 {
    300_000
}

fn default_pause_min() -> u64 {
    30_000
}

fn default_pause_max() -> u64 {
    90_000
}

fn default_distance() -> f64 {
    600.0
}

fn default_max_scrolls() -> u32 {
    50
}

fn default_idle_rounds() -> u32 {
    3
}

fn default_poll_interval() -> u64 {
    1_000
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Self {
        Self::load_from_path(Self::default_config_path())
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: PathBuf) -> Self {
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse config file: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("No config file found at {:?}, using defaults", path);
                Self::default()
            }
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("extraction-router")
            .join("config.toml")
    }

    /// Fingerprint database path, configured or default
    pub fn database_path(&self) -> PathBuf {
        self.drift
            .database_path
            .clone()
            .unwrap_or_else(crate::store::SqliteStore::default_path)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, path: PathBuf) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;

        std::fs::write(&path, contents)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.general.enabled);
        assert_eq!(config.rate_limit.max_tokens, 10.0);
        assert_eq!(config.rate_limit.pause_interval_ms, 300_000);
        assert_eq!(config.scroll.max_scrolls, 50);
        assert_eq!(config.drift.landmarks, default_landmarks());
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r##"
[general]
enabled = true
log_level = "debug"

[rate_limit]
max_tokens = 4.0
pause_interval_ms = 0

[drift]
landmarks = ["#app", "#main"]
database_path = "/tmp/fp.db"
"##;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.rate_limit.max_tokens, 4.0);
        assert_eq!(config.rate_limit.pause_interval_ms, 0);
        assert_eq!(config.rate_limit.refill_rate_per_ms, 0.0005);
        assert_eq!(config.scroll.idle_rounds, 3);
        assert_eq!(config.drift.landmarks, vec!["#app", "#main"]);
        assert_eq!(config.database_path(), PathBuf::from("/tmp/fp.db"));
    }

    #[test]
    fn test_limiter_config_floors_capacity() {
        let config = RateLimitConfig {
            max_tokens: 0.0,
            ..RateLimitConfig::default()
        };
        assert_eq!(config.limiter_config().max_tokens, 1.0);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg").join("config.toml");

        let mut config = Config::default();
        config.scroll.distance_px = 420.0;
        config.drift.storage_key = "custom".to_string();
        config.save_to_path(path.clone()).unwrap();

        let loaded = Config::load_from_path(path);
        assert_eq!(loaded.scroll.distance_px, 420.0);
        assert_eq!(loaded.drift.storage_key, "custom");
    }

    #[test]
    fn test_unparsable_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not = [valid").unwrap();
        let config = Config::load_from_path(path);
        assert_eq!(config.scroll.poll_interval_ms, 1_000);
    }
}
