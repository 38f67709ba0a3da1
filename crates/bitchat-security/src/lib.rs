//! BitChat Identity and Channel Security
//!
//! Correlates connection-scoped transport peers with durable cryptographic
//! fingerprints, keeps user trust decisions in an encrypted write-through
//! cache, and provides password-protected channel encryption with replay-safe
//! key sharing.
//!
//! The crypto backend is chosen at compile time (see [`crypto`]); everything
//! else talks to it through [`CryptoProvider`].

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod logging;

pub mod channel;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod identity;
pub mod storage;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use channel::{ChannelKey, ChannelKeyPacket, NoiseChannelEncryption};
pub use config::{ChannelEncryptionConfig, IdentityStoreConfig, SecurityConfig};
pub use crypto::{default_crypto_provider, generate_fingerprint, CryptoProvider, PlatformCryptoProvider, RustCryptoProvider};
#[cfg(all(feature = "native-crypto", not(target_arch = "wasm32")))]
pub use crypto::RingCryptoProvider;
pub use errors::{
    BitchatError, BitchatResult, ChannelEncryptionError, CryptographicError, Result, SessionError,
    StorageError,
};
pub use identity::{
    EphemeralIdentity, HandshakeState, IdentityCache, IdentityCacheStats, IdentityHint,
    PendingActions, SecureIdentityStateManager, SocialIdentity, TrustLevel,
};
pub use storage::{FileSecureStorage, MemoryStorage, SecureStorage};
pub use types::{Fingerprint, PeerId, SystemTimeSource, TimeSource, Timestamp};
