//! Error types for BitChat identity and channel security
//!
//! Focused error enums for cryptography, channel encryption, secure storage and
//! session lookup, unified under [`BitchatError`].

use thiserror::Error;

// ----------------------------------------------------------------------------
// Specific Error Types
// ----------------------------------------------------------------------------

/// Failures raised by a [`CryptoProvider`](crate::crypto::CryptoProvider) backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptographicError {
    #[error("Encryption failed")]
    EncryptionFailed,
    #[error("Decryption failed")]
    DecryptionFailed,
    #[error("Key derivation failed")]
    KeyDerivationFailed,
    #[error("Invalid key format: expected {expected} bytes, got {actual}")]
    InvalidKeyFormat { expected: usize, actual: usize },
    #[error("Invalid nonce length: expected {expected} bytes, got {actual}")]
    InvalidNonceLength { expected: usize, actual: usize },
    #[error("Random number generation failed")]
    RandomGenerationFailed,
    #[error("Key agreement produced a non-contributory shared secret")]
    KeyAgreementFailed,
}

/// Channel encryption failures surfaced to callers of the channel layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelEncryptionError {
    #[error("No key is set for channel {channel}")]
    NoChannelKey { channel: String },
    #[error("Invalid channel ciphertext ({length} bytes)")]
    InvalidCiphertext { length: usize },
    #[error("Channel message decryption failed")]
    DecryptionFailed,
}

/// Secure storage failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("Secure storage not available on this platform")]
    NotAvailable,
    #[error("Access denied to secure storage")]
    AccessDenied,
    #[error("Key not found: {0}")]
    KeyNotFound(String),
    #[error("Storage I/O error: {0}")]
    Io(String),
    #[error("Storage serialization error: {0}")]
    Serialization(String),
}

/// Session lookup failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Session not found for peer {peer_id}")]
    SessionNotFound { peer_id: String },
}

// ----------------------------------------------------------------------------
// Top-level Error
// ----------------------------------------------------------------------------

/// Core error type for BitChat security operations
#[derive(Debug, Error)]
pub enum BitchatError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cryptographic error: {0}")]
    Crypto(#[from] CryptographicError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelEncryptionError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Invalid identifier or malformed input
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Configuration error
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    /// Blocking worker failed to complete
    #[error("Background task failed: {message}")]
    Task { message: String },
}

// ----------------------------------------------------------------------------
// Convenience Error Constructors
// ----------------------------------------------------------------------------

impl BitchatError {
    /// Create an invalid input error with a message
    pub fn invalid_input<T: Into<String>>(message: T) -> Self {
        BitchatError::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a configuration error with a reason
    pub fn config_error<T: Into<String>>(reason: T) -> Self {
        BitchatError::Configuration {
            reason: reason.into(),
        }
    }

    /// Create a generic storage I/O error
    pub fn storage_error<T: Into<String>>(message: T) -> Self {
        BitchatError::Storage(StorageError::Io(message.into()))
    }

    /// Create a session not found error
    pub fn session_not_found<P: Into<String>>(peer_id: P) -> Self {
        BitchatError::Session(SessionError::SessionNotFound {
            peer_id: peer_id.into(),
        })
    }

    /// Create a missing channel key error
    pub fn no_channel_key<C: Into<String>>(channel: C) -> Self {
        BitchatError::Channel(ChannelEncryptionError::NoChannelKey {
            channel: channel.into(),
        })
    }

    /// Create a task failure error
    pub fn task_failed<T: Into<String>>(message: T) -> Self {
        BitchatError::Task {
            message: message.into(),
        }
    }

    /// Returns the channel error if this is one
    pub fn as_channel_error(&self) -> Option<&ChannelEncryptionError> {
        match self {
            BitchatError::Channel(err) => Some(err),
            _ => None,
        }
    }
}

// ----------------------------------------------------------------------------
// Type Aliases
// ----------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, BitchatError>;
pub type BitchatResult<T> = Result<T>;
