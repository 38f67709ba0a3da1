//! Identity correlation for BitChat
//!
//! Two identity layers:
//! 1. Ephemeral Identity - per-connection transport peer and handshake state
//! 2. Social Identity - durable, fingerprint-keyed trust metadata
//!
//! The handshake is the only bridge between the two; nickname resolution
//! produces hints, never authentication.

// Module declarations
pub mod cache;
pub mod ephemeral;
pub mod manager;
pub mod social;
pub mod types;

// Re-export commonly used types
pub use cache::{IdentityCache, IdentityCacheStats};
pub use ephemeral::EphemeralIdentity;
pub use manager::SecureIdentityStateManager;
pub use social::{SocialIdentity, PLACEHOLDER_NICKNAME};
pub use types::{HandshakeState, IdentityHint, PendingActions, TrustLevel};
