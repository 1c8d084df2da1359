//! Push pipeline configuration
//!
//! [`PushConfig`] collects everything the runtime needs: where the VoIP token
//! is persisted, the fallbacks used for incomplete call pushes, how
//! foreground notifications are shown, how long the presenter may take,
//! and logging settings. Every field has
//! a default, so an empty configuration is valid.
//!
//! Configuration can be built in code, parsed from TOML, or loaded from an
//! optional TOML file layered with `VOIP_PUSH_*` environment variables
//! (nested keys use `__`, e.g. `VOIP_PUSH_LOGGING__LEVEL=debug`).
//!
//! # Usage Examples
//!
//! ## Builder style
//!
//! ```rust
//! use rvoip_push_core::config::PushConfig;
//!
//! let config = PushConfig::new()
//!     .with_token_store_key("voip_token")
//!     .with_token_store_path("/var/lib/push/tokens.json");
//!
//! assert_eq!(config.token_store_key, "voip_token");
//! assert!(config.validate().is_ok());
//! ```
//!
//! ## From TOML
//!
//! ```rust
//! use rvoip_push_core::config::PushConfig;
//!
//! let config = PushConfig::from_toml_str(r#"
//!     token_store_key = "cached_voip_token"
//!
//!     [call_defaults]
//!     name_caller = "Unbekannt"
//!     text_accept = "Annehmen"
//!
//!     [foreground]
//!     badge = false
//!
//!     [logging]
//!     level = "debug"
//! "#).unwrap();
//!
//! assert_eq!(config.call_defaults.name_caller, "Unbekannt");
//! assert_eq!(config.call_defaults.handle, "Caller");
//! assert!(config.foreground.alert);
//! assert!(!config.foreground.badge);
//! assert_eq!(config.logging.level, "debug");
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::call_event::CallDefaults;
use crate::error::{PushError, Result};
use crate::events::PresentationOptions;
use crate::logging::parse_log_level;
use crate::token::DEFAULT_TOKEN_KEY;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "VOIP_PUSH";

/// How long the presenter gets before a push is acknowledged without it
pub const DEFAULT_PRESENTER_TIMEOUT_MS: u64 = 5_000;

/// Logging section of the configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Minimum level: trace, debug, info, warn or error
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
    /// Include source file and line
    pub file_info: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file_info: false,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    /// Key the current VoIP token is persisted under
    pub token_store_key: String,
    /// JSON file backing the token store; in-memory when unset
    pub token_store_path: Option<PathBuf>,
    /// Fallbacks for fields missing from call pushes
    pub call_defaults: CallDefaults,
    /// Presentation for notifications arriving in the foreground
    pub foreground: PresentationOptions,
    /// Deadline for one presenter call, in milliseconds
    pub presenter_timeout_ms: u64,
    pub logging: LogSettings,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            token_store_key: DEFAULT_TOKEN_KEY.to_string(),
            token_store_path: None,
            call_defaults: CallDefaults::default(),
            foreground: PresentationOptions::default(),
            presenter_timeout_ms: DEFAULT_PRESENTER_TIMEOUT_MS,
            logging: LogSettings::default(),
        }
    }
}

impl PushConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token_store_key(mut self, key: impl Into<String>) -> Self {
        self.token_store_key = key.into();
        self
    }

    pub fn with_token_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_store_path = Some(path.into());
        self
    }

    pub fn with_call_defaults(mut self, defaults: CallDefaults) -> Self {
        self.call_defaults = defaults;
        self
    }

    pub fn with_foreground(mut self, options: PresentationOptions) -> Self {
        self.foreground = options;
        self
    }

    pub fn with_presenter_timeout(mut self, timeout: Duration) -> Self {
        self.presenter_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn presenter_timeout(&self) -> Duration {
        Duration::from_millis(self.presenter_timeout_ms)
    }

    pub fn with_logging(mut self, logging: LogSettings) -> Self {
        self.logging = logging;
        self
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: PushConfig = toml::from_str(text).map_err(|e| PushError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an optional TOML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        );

        let config: PushConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check the settings that have no sensible fallback
    pub fn validate(&self) -> Result<()> {
        if self.token_store_key.trim().is_empty() {
            return Err(PushError::Config("token_store_key must not be empty".to_string()));
        }
        if let Some(path) = &self.token_store_path {
            if path.as_os_str().is_empty() {
                return Err(PushError::Config("token_store_path must not be empty".to_string()));
            }
        }
        if self.presenter_timeout_ms == 0 {
            return Err(PushError::Config("presenter_timeout_ms must be positive".to_string()));
        }
        parse_log_level(&self.logging.level)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call_event::HandleType;

    #[test]
    fn test_defaults_are_valid() {
        let config = PushConfig::default();
        assert_eq!(config.token_store_key, "cached_voip_token");
        assert!(config.token_store_path.is_none());
        assert_eq!(config.foreground, PresentationOptions::default());
        assert_eq!(config.presenter_timeout(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presenter_timeout() {
        let config = PushConfig::from_toml_str("presenter_timeout_ms = 250").unwrap();
        assert_eq!(config.presenter_timeout(), Duration::from_millis(250));

        let config = PushConfig::new().with_presenter_timeout(Duration::from_secs(2));
        assert_eq!(config.presenter_timeout_ms, 2_000);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(PushConfig::from_toml_str("").unwrap(), PushConfig::default());
    }

    #[test]
    fn test_platform_defaults_from_toml() {
        let config = PushConfig::from_toml_str(
            r#"
            [call_defaults.platform_options]
            iconName = "AppIcon"
            handleType = "number"
            "#,
        )
        .unwrap();
        let options = &config.call_defaults.platform_options;
        assert_eq!(options.icon_name, "AppIcon");
        assert_eq!(options.handle_type, HandleType::Number);
        assert_eq!(options.maximum_call_groups, 2);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(PushConfig::from_toml_str("token_store_key = \"\"").is_err());
        assert!(PushConfig::from_toml_str("[logging]\nlevel = \"loud\"").is_err());
        assert!(PushConfig::from_toml_str("token_store_key = 5").is_err());
        assert!(PushConfig::from_toml_str("presenter_timeout_ms = 0").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("push.toml");
        std::fs::write(&path, "token_store_key = \"from_file\"\n[foreground]\nsound = false\n").unwrap();

        let config = PushConfig::load(Some(&path)).unwrap();
        assert_eq!(config.token_store_key, "from_file");
        assert!(!config.foreground.sound);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PushConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
