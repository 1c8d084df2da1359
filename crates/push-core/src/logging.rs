//! Logging setup built on `tracing-subscriber`
//!
//! Logs go to stderr so stdout stays free for command output. `RUST_LOG`
//! directives apply on top of the configured level.

use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LogSettings;
use crate::error::{PushError, Result};

/// How the global subscriber is installed
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level
    pub level: Level,
    /// JSON lines instead of human-readable output
    pub json: bool,
    /// Include source file and line
    pub file_info: bool,
    /// Name announced by [`log_welcome`]
    pub app_name: String,
}

impl LoggingConfig {
    pub fn new(level: Level, app_name: impl Into<String>) -> Self {
        Self {
            level,
            json: false,
            file_info: false,
            app_name: app_name.into(),
        }
    }

    /// Build from the `[logging]` section of a [`PushConfig`](crate::config::PushConfig)
    pub fn from_settings(settings: &LogSettings, app_name: impl Into<String>) -> Result<Self> {
        Ok(Self {
            json: settings.json,
            file_info: settings.file_info,
            ..Self::new(parse_log_level(&settings.level)?, app_name)
        })
    }

    pub fn with_json(mut self) -> Self {
        self.json = true;
        self
    }
}

/// Install the global subscriber
///
/// Fails if a global subscriber is already installed.
pub fn setup_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(config.level.into());

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(config.file_info)
        .with_line_number(config.file_info);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| PushError::Config(format!("Failed to install logger: {}", e)))
}

/// Parse a log level such as `debug` or `WARN`
pub fn parse_log_level(level: &str) -> Result<Level> {
    Level::from_str(level.trim()).map_err(|_| PushError::Config(format!("Invalid log level: {}", level)))
}

/// Announce the application and version at startup
pub fn log_welcome(config: &LoggingConfig, version: &str) {
    tracing::info!(json = config.json, level = %config.level, "Starting {} v{}", config.app_name, version);
}
