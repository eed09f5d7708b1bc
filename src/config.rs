//! # Activation Configuration
//!
//! Settings for handler activation: which generic definition marks redelivered
//! messages, where a unit of work keeps its service scope, and how logging is set up.
//!
//! Configuration comes from built-in defaults, optionally layered with a file
//! (TOML, YAML or JSON, picked by extension) and `DISPATCH_*` environment overrides.
//!
//! ```rust,no_run
//! use dispatch_core::config::ActivationConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ActivationConfig::load("config/dispatch.toml")?;
//! assert!(!config.redelivery_wrapper.is_empty());
//! # Ok(())
//! # }
//! ```

use crate::constants::{environments, DEFAULT_REDELIVERY_WRAPPER, DEFAULT_SCOPE_ITEM_KEY, ENV_PREFIX};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Invalid configuration value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

impl ConfigurationError {
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ActivationConfig {
    /// Deployment environment (development, test, production)
    pub environment: String,

    /// Generic definition that wraps messages whose delivery failed
    pub redelivery_wrapper: String,

    /// Unit-of-work shared-store key for the service scope
    pub scope_item_key: String,

    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Explicit filter directive; derived from the environment when absent
    pub level: Option<String>,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            environment: environments::DEVELOPMENT.to_string(),
            redelivery_wrapper: DEFAULT_REDELIVERY_WRAPPER.to_string(),
            scope_item_key: DEFAULT_SCOPE_ITEM_KEY.to_string(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ActivationConfig {
    /// Defaults overridden by `DISPATCH_*` environment variables
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::layered(None)
    }

    /// Defaults, then the given file, then `DISPATCH_*` environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        debug!("Loading activation configuration from {}", path.display());
        Self::layered(Some(path))
    }

    /// Both loaders read the same variable names: top-level keys as
    /// `DISPATCH_ENVIRONMENT`, nested keys joined with `__` as in
    /// `DISPATCH_LOGGING__LEVEL`
    fn layered(path: Option<&Path>) -> Result<Self, ConfigurationError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.redelivery_wrapper.trim().is_empty() {
            return Err(ConfigurationError::invalid_value(
                "redelivery_wrapper",
                "must not be empty",
            ));
        }
        if self.scope_item_key.trim().is_empty() {
            return Err(ConfigurationError::invalid_value(
                "scope_item_key",
                "must not be empty",
            ));
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == environments::PRODUCTION
    }

    /// JSON view of the configuration for diagnostics
    pub fn debug_config(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }
}
