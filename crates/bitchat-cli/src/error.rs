//! Error handling for the BitChat trust CLI

use thiserror::Error;

use crate::config::ConfigError;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error("BitChat security error: {0}")]
    Security(#[from] bitchat_security::BitchatError),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Hex decoding error: {0}")]
    HexDecoding(#[from] hex::FromHexError),
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions_used_by_commands() {
        let err: CliError = hex::decode("zz").unwrap_err().into();
        assert!(matches!(err, CliError::HexDecoding(_)));

        let err: CliError = bitchat_security::BitchatError::no_channel_key("#c").into();
        assert!(matches!(err, CliError::Security(_)));
        assert!(err.to_string().starts_with("BitChat security error"));
    }
}
