//! Runtime configuration
//!
//! Loaded from YAML by the CLI; every section falls back to defaults so an
//! empty or partial file is valid.

use std::path::PathBuf;

use action_locator::DEFAULT_TIMEOUT_MS;
use command_handlers::HandlerSettings;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_DEFAULT_TIMEOUT_MS: &str = "UIA_DEFAULT_TIMEOUT_MS";
pub const ENV_APP_PACKAGE: &str = "UIA_APP_PACKAGE";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be a whole number of milliseconds, got {value:?}")]
    InvalidTimeout { key: &'static str, value: String },
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub locator: LocatorConfig,
    pub tree: TreeConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Lookup timeout used when a request carries none
    pub default_timeout_ms: u64,
    /// Package used to qualify short ids when the device reports none
    pub app_package: Option<String>,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            app_package: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// JSON tree used by the local runtime when `--tree` is not given
    pub fixture: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    /// Apply `UIA_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_DEFAULT_TIMEOUT_MS) {
            self.locator.default_timeout_ms =
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidTimeout {
                        key: ENV_DEFAULT_TIMEOUT_MS,
                        value: raw.clone(),
                    })?;
        }
        if let Some(package) = lookup(ENV_APP_PACKAGE) {
            let package = package.trim();
            self.locator.app_package = (!package.is_empty()).then(|| package.to_string());
        }
        Ok(())
    }

    pub fn handler_settings(&self) -> HandlerSettings {
        HandlerSettings {
            default_timeout_ms: self.locator.default_timeout_ms,
            app_package: self.locator.app_package.clone(),
        }
    }
}
