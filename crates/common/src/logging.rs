//! Logging setup and configuration
//!
//! Verbosity is carried by an explicit [`LogConfig`] value handed to the
//! components that need it, never by process-global mutable state. Each
//! debug area maps to a tracing target filter so operators can turn on
//! transfer tracing without drowning in control-path noise.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Verbosity for one debug area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AreaLevel {
    Off,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl AreaLevel {
    fn as_str(&self) -> &'static str {
        match self {
            AreaLevel::Off => "off",
            AreaLevel::Error => "error",
            AreaLevel::Warn => "warn",
            AreaLevel::Info => "info",
            AreaLevel::Debug => "debug",
            AreaLevel::Trace => "trace",
        }
    }
}

/// Logging configuration object
///
/// One per driver instance. The per-area levels correspond to the driver's
/// tracing targets: control relay, transfer engine, device configuration,
/// and recovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Base level for everything not covered by an area
    pub default_level: String,
    /// Control relay verbosity
    #[serde(default)]
    pub ioctl: AreaLevel,
    /// Transfer engine verbosity
    #[serde(default)]
    pub transfer: AreaLevel,
    /// Device configuration / lifecycle verbosity
    #[serde(default)]
    pub config: AreaLevel,
    /// Recovery worker verbosity
    #[serde(default)]
    pub recovery: AreaLevel,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            ioctl: AreaLevel::default(),
            transfer: AreaLevel::default(),
            config: AreaLevel::default(),
            recovery: AreaLevel::default(),
        }
    }
}

impl LogConfig {
    /// Render the EnvFilter directive string for this configuration
    pub fn filter_directives(&self) -> String {
        format!(
            "{},driver::usb::relay={},driver::usb::engine={},driver::usb::device={},driver::usb::recovery={}",
            self.default_level,
            self.ioctl.as_str(),
            self.transfer.as_str(),
            self.config.as_str(),
            self.recovery.as_str(),
        )
    }
}

/// Setup the tracing subscriber for the process
///
/// An explicit `RUST_LOG` in the environment wins over the configured
/// levels.
pub fn setup_logging(config: &LogConfig) -> crate::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.filter_directives()))
        .map_err(|e| crate::Error::Config(format!("Invalid log filter: {}", e)))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    Ok(())
}
