//! Driver configuration management

use std::fs;
use std::path::Path;

use common::LogConfig;
use serde::{Deserialize, Serialize};

/// Driver configuration, loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DriverConfig {
    /// Logging verbosity per area
    #[serde(default)]
    pub log: LogConfig,
    /// Attach-time power policy
    #[serde(default)]
    pub power: PowerSettings,
}

/// Power policy applied at attach to remote-wake-capable devices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerSettings {
    /// Selective-suspend idle timeout in milliseconds
    #[serde(default = "PowerSettings::default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
    /// Whether the device may wake the system
    #[serde(default = "PowerSettings::default_allow_remote_wake")]
    pub allow_remote_wake: bool,
}

impl Default for PowerSettings {
    fn default() -> Self {
        Self {
            idle_timeout_ms: Self::default_idle_timeout_ms(),
            allow_remote_wake: Self::default_allow_remote_wake(),
        }
    }
}

impl PowerSettings {
    fn default_idle_timeout_ms() -> u64 {
        10_000
    }

    fn default_allow_remote_wake() -> bool {
        true
    }
}

impl DriverConfig {
    /// Load a configuration file, validating its contents
    pub fn load(path: &Path) -> common::Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| common::Error::Config(format!("Invalid config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings for consistency
    pub fn validate(&self) -> common::Result<()> {
        if self.power.idle_timeout_ms == 0 {
            return Err(common::Error::Config(
                "power.idle_timeout_ms must be nonzero".to_string(),
            ));
        }
        self.log
            .default_level
            .parse::<tracing::level_filters::LevelFilter>()
            .map_err(|e| common::Error::Config(format!("Invalid log level: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = DriverConfig::default();
        assert_eq!(config.power.idle_timeout_ms, 10_000);
        assert!(config.power.allow_remote_wake);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[log]
default_level = "debug"
transfer = "trace"

[power]
idle_timeout_ms = 5000
allow_remote_wake = false
"#
        )
        .unwrap();

        let config = DriverConfig::load(file.path()).unwrap();
        assert_eq!(config.log.default_level, "debug");
        assert_eq!(config.power.idle_timeout_ms, 5000);
        assert!(!config.power.allow_remote_wake);
    }

    #[test]
    fn test_zero_idle_timeout_rejected() {
        let config = DriverConfig {
            power: PowerSettings {
                idle_timeout_ms: 0,
                allow_remote_wake: true,
            },
            ..DriverConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_level_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[log]
default_level = "chatty"
"#
        )
        .unwrap();
        assert!(DriverConfig::load(file.path()).is_err());
    }
}
