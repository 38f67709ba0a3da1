//! Centralized Configuration Management
//!
//! Configuration for the identity state manager and the channel encryption
//! layer, grouped under [`SecurityConfig`].

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{BitchatError, Result};

// ----------------------------------------------------------------------------
// Identity Store Configuration
// ----------------------------------------------------------------------------

/// Names of the identity entries in secure storage
///
/// Both names are stored under the `identity_` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityStoreConfig {
    /// Entry holding the encrypted identity cache
    pub cache_blob_name: String,
    /// Entry holding the cache encryption key
    pub encryption_key_name: String,
}

impl Default for IdentityStoreConfig {
    fn default() -> Self {
        Self {
            cache_blob_name: "bitchat.identityCache.v2".to_string(),
            encryption_key_name: "identityCacheEncryptionKey".to_string(),
        }
    }
}

// ----------------------------------------------------------------------------
// Channel Encryption Configuration
// ----------------------------------------------------------------------------

/// Channel key derivation and key-sharing parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEncryptionConfig {
    /// PBKDF2-HMAC-SHA256 iteration count
    pub pbkdf2_iterations: u32,
    /// Derived channel key length in bytes
    pub derived_key_len: usize,
    /// Key packets this old (or older) are rejected
    pub key_packet_max_age_secs: u64,
    /// Period of the replay-nonce cleanup task
    pub nonce_cleanup_interval_secs: u64,
    /// Replay set size above which cleanup clears it
    pub max_tracked_nonces: usize,
}

impl Default for ChannelEncryptionConfig {
    fn default() -> Self {
        Self {
            pbkdf2_iterations: 210_000, // OWASP recommendation for PBKDF2-SHA256
            derived_key_len: 32,
            key_packet_max_age_secs: 300,
            nonce_cleanup_interval_secs: 300,
            max_tracked_nonces: 1000,
        }
    }
}

impl ChannelEncryptionConfig {
    /// Cheap key derivation for test suites
    ///
    /// Keys derived with this config do not match production keys.
    pub fn testing() -> Self {
        Self {
            pbkdf2_iterations: 1_000,
            ..Self::default()
        }
    }

    /// Maximum accepted key packet age
    pub fn key_packet_max_age(&self) -> Duration {
        Duration::from_secs(self.key_packet_max_age_secs)
    }

    /// Replay-nonce cleanup period, never shorter than one second
    pub fn nonce_cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.nonce_cleanup_interval_secs.max(1))
    }

    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        if self.pbkdf2_iterations == 0 {
            return Err(BitchatError::config_error(
                "PBKDF2 iteration count must be greater than 0",
            ));
        }
        if self.derived_key_len != crate::crypto::SYMMETRIC_KEY_LEN {
            return Err(BitchatError::config_error(format!(
                "Derived channel key must be {} bytes, got {}",
                crate::crypto::SYMMETRIC_KEY_LEN,
                self.derived_key_len
            )));
        }
        if self.key_packet_max_age_secs == 0 {
            return Err(BitchatError::config_error(
                "Key packet max age must be greater than 0",
            ));
        }
        if self.nonce_cleanup_interval_secs == 0 {
            return Err(BitchatError::config_error(
                "Nonce cleanup interval must be greater than 0",
            ));
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Combined Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the security subsystem
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Identity cache storage names
    pub identity: IdentityStoreConfig,
    /// Channel encryption parameters
    pub channels: ChannelEncryptionConfig,
}

impl SecurityConfig {
    /// Configuration optimized for testing
    pub fn testing() -> Self {
        Self {
            identity: IdentityStoreConfig::default(),
            channels: ChannelEncryptionConfig::testing(),
        }
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> Result<()> {
        if self.identity.cache_blob_name.is_empty() || self.identity.encryption_key_name.is_empty()
        {
            return Err(BitchatError::config_error(
                "Identity storage entry names must not be empty",
            ));
        }
        if self.identity.cache_blob_name == self.identity.encryption_key_name {
            return Err(BitchatError::config_error(
                "Identity cache blob and encryption key must use different entries",
            ));
        }
        self.channels.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SecurityConfig::default();
        config.validate().unwrap();
        assert_eq!(config.channels.pbkdf2_iterations, 210_000);
        assert_eq!(config.channels.key_packet_max_age(), Duration::from_secs(300));
        assert_eq!(config.channels.max_tracked_nonces, 1000);
        SecurityConfig::testing().validate().unwrap();
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let mut config = SecurityConfig::default();
        config.channels.pbkdf2_iterations = 0;
        assert!(config.validate().is_err());

        let mut config = SecurityConfig::default();
        config.channels.derived_key_len = 16;
        assert!(config.validate().is_err());

        let mut config = SecurityConfig::default();
        config.identity.encryption_key_name = config.identity.cache_blob_name.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_cleanup_interval_is_clamped() {
        let config = ChannelEncryptionConfig {
            nonce_cleanup_interval_secs: 0,
            ..ChannelEncryptionConfig::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(config.nonce_cleanup_interval(), Duration::from_secs(1));
    }
}
