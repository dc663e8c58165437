//! Configuration for the environmental dashboard.

use crate::core::DEFAULT_ONLINE_THRESHOLD_SECS;
use chrono::Duration;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Largest accepted online threshold, one day.
pub const MAX_ONLINE_THRESHOLD_SECS: u64 = 86_400;

/// Main configuration for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum reading age (seconds) for a device to count as online
    pub online_threshold_secs: u64,

    /// Most recent readings considered per reading snapshot
    pub history_window: usize,

    /// IANA timezone for chart clock labels
    pub display_timezone: String,

    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,

    /// Undelivered snapshots a feed can hold
    pub feed_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            online_threshold_secs: DEFAULT_ONLINE_THRESHOLD_SECS,
            history_window: 120,
            display_timezone: "UTC".to_string(),
            log_level: "info".to_string(),
            feed_capacity: 16,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("envmon-dashboard")
            .join("config.json")
    }

    /// The parsed display timezone.
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.display_timezone.parse::<Tz>().map_err(|_| {
            ConfigError::Invalid(format!("unknown timezone '{}'", self.display_timezone))
        })
    }

    /// The online threshold as a duration.
    pub fn online_threshold(&self) -> Result<Duration, ConfigError> {
        if self.online_threshold_secs > MAX_ONLINE_THRESHOLD_SECS {
            return Err(ConfigError::Invalid(format!(
                "online_threshold_secs must be at most {MAX_ONLINE_THRESHOLD_SECS}"
            )));
        }
        i64::try_from(self.online_threshold_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| {
                ConfigError::Invalid("online_threshold_secs is out of range".to_string())
            })
    }

    /// Check values that would make the dashboard unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_window == 0 {
            return Err(ConfigError::Invalid(
                "history_window must be at least 1".to_string(),
            ));
        }
        if self.feed_capacity == 0 {
            return Err(ConfigError::Invalid(
                "feed_capacity must be at least 1".to_string(),
            ));
        }
        self.online_threshold()?;
        self.timezone()?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::Invalid(e) => write!(f, "Invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join("envmon-dashboard-test")
            .join(format!("{name}-{}.json", std::process::id()))
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.online_threshold_secs, 30);
        assert_eq!(config.history_window, 120);
        assert_eq!(config.timezone().unwrap(), Tz::UTC);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = Config {
            history_window: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = Config {
            display_timezone: "Mars/Olympus_Mons".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_oversized_online_threshold_rejected() {
        let config = Config {
            online_threshold_secs: u64::MAX / 2,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        assert!(matches!(
            config.online_threshold(),
            Err(ConfigError::Invalid(_))
        ));

        let config = Config {
            online_threshold_secs: MAX_ONLINE_THRESHOLD_SECS,
            ..Config::default()
        };
        assert_eq!(
            config.online_threshold().unwrap(),
            Duration::seconds(MAX_ONLINE_THRESHOLD_SECS as i64)
        );
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = temp_config_path("roundtrip");
        let config = Config {
            online_threshold_secs: 60,
            display_timezone: "Asia/Kolkata".to_string(),
            ..Config::default()
        };

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = temp_config_path("missing");
        assert_eq!(Config::load_from(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let path = temp_config_path("partial");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"history_window": 100}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.history_window, 100);
        assert_eq!(config.online_threshold_secs, 30);

        let _ = std::fs::remove_file(&path);
    }
}
