//! BitChat trust CLI library
//!
//! Offline management of the identity trust cache and channel passwords kept in
//! a file-backed credential store.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod replay;

pub use app::TrustApp;
pub use cli::{ChannelCommand, Cli, Commands, IdentityCommand};
pub use config::{CliAppConfig, ConfigError};
pub use error::{CliError, Result};
pub use replay::ReplayLedger;
