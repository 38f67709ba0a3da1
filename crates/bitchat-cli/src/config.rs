//! BitChat trust CLI configuration
//!
//! Layered with figment, later layers winning:
//! 1. Default values
//! 2. `bitchat.toml` in the working directory
//! 3. `~/.bitchat/config.toml`
//! 4. Environment variables (`BITCHAT_*`, nested keys separated by `__`,
//!    e.g. `BITCHAT_SECURITY__CHANNELS__PBKDF2_ITERATIONS`)
//! 5. Command line arguments

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use bitchat_security::{storage::DEFAULT_SERVICE_ID, SecurityConfig};

// ----------------------------------------------------------------------------
// CLI Application Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the trust CLI
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliAppConfig {
    /// Identity store and channel encryption parameters
    pub security: SecurityConfig,

    /// Credential store location
    pub storage: StorageSettings,

    /// CLI-specific configuration
    pub cli: CliSettings,
}

/// Where credentials live on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Base directory (defaults to ~/.bitchat/credentials)
    pub data_dir: Option<PathBuf>,

    /// Service namespace below the base directory
    pub service_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliSettings {
    /// Enable verbose logging output
    pub verbose: bool,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: None,
            service_id: DEFAULT_SERVICE_ID.to_string(),
        }
    }
}

// ----------------------------------------------------------------------------
// Configuration Loading Logic
// ----------------------------------------------------------------------------

impl CliAppConfig {
    /// Load configuration with the standard priority order
    ///
    /// An explicit `config_file` replaces the two default file locations.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        figment = match config_file {
            Some(path) => figment.merge(Toml::file(path)),
            None => {
                let figment = figment.merge(Toml::file("bitchat.toml"));
                match Self::default_config_path() {
                    Some(path) => figment.merge(Toml::file(path)),
                    None => figment,
                }
            }
        };

        let config: CliAppConfig = figment
            .merge(Env::prefixed("BITCHAT_").split("__"))
            .extract()
            .map_err(|e| ConfigError::Loading(format!("Failed to load configuration: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Apply command line overrides
    pub fn with_overrides(mut self, data_dir: Option<&str>, verbose: bool) -> Self {
        if let Some(dir) = data_dir {
            self.storage.data_dir = Some(PathBuf::from(dir));
        }
        self.cli.verbose |= verbose;
        self
    }

    /// Default user configuration file (~/.bitchat/config.toml)
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".bitchat").join("config.toml"))
    }

    /// Effective credential directory
    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = &self.storage.data_dir {
            return Ok(dir.clone());
        }
        dirs::home_dir()
            .map(|home| home.join(".bitchat").join("credentials"))
            .ok_or_else(|| {
                ConfigError::Environment("No home directory; pass --data-dir".to_string())
            })
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.security
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        if self.storage.service_id.is_empty()
            || self.storage.service_id.contains(['/', '\\'])
        {
            return Err(ConfigError::Validation(format!(
                "Invalid storage service id: {:?}",
                self.storage.service_id
            )));
        }

        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialization(format!("Failed to serialize config: {e}")))
    }
}

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Configuration-related errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {0}")]
    Loading(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment error: {0}")]
    Environment(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
