//! Command-line interface definitions and parsing

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Directory holding the credential store
    #[arg(short, long)]
    pub data_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect and edit trust decisions about peers
    Identities {
        #[command(subcommand)]
        action: IdentityCommand,
    },
    /// Manage password-protected channels
    Channel {
        #[command(subcommand)]
        action: ChannelCommand,
    },
    /// Erase all identity data and channel passwords
    Panic {
        /// Skip the confirmation check
        #[arg(long)]
        yes: bool,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Subcommand)]
pub enum IdentityCommand {
    /// List known identities
    List,
    /// Guess which fingerprint a nickname belongs to
    Resolve { nickname: String },
    /// Mark a fingerprint as favorite
    Favorite {
        fingerprint: String,
        /// Remove the mark instead
        #[arg(long)]
        off: bool,
    },
    /// Block a fingerprint
    Block {
        fingerprint: String,
        /// Unblock instead
        #[arg(long)]
        off: bool,
    },
    /// Record an out-of-band fingerprint verification
    Verify {
        fingerprint: String,
        /// Withdraw verification instead
        #[arg(long)]
        off: bool,
    },
    /// Set or clear a local petname
    Petname {
        fingerprint: String,
        /// New petname; omit to clear
        name: Option<String>,
    },
    /// Forget everything about a fingerprint
    Forget { fingerprint: String },
}

#[derive(Subcommand)]
pub enum ChannelCommand {
    /// Derive and store the key for a channel password
    SetPassword {
        channel: String,
        password: String,
        /// Creator fingerprint bound into the key (hex)
        #[arg(long)]
        creator: Option<String>,
    },
    /// Encrypt a message; prints hex
    Encrypt { channel: String, text: String },
    /// Decrypt a hex message
    Decrypt { channel: String, hex: String },
    /// Remove a channel password
    Forget { channel: String },
    /// List channels with stored passwords
    List,
    /// Print a key packet for a stored channel password
    Share { channel: String },
    /// Accept a key packet and store its password
    ///
    /// A packet is accepted once; replays are rejected across runs until the
    /// packet is stale.
    Accept { packet: String },
}
