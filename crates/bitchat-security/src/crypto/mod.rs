//! Cryptographic capability provider
//!
//! All hashing, MAC, AEAD, key agreement and password derivation used by the
//! identity manager and the channel layer goes through [`CryptoProvider`].
//! Two backends exist:
//!
//! - [`RustCryptoProvider`] - pure Rust, builds everywhere including `wasm32`
//! - `RingCryptoProvider` - `ring` based, enabled by the `native-crypto` feature
//!
//! [`PlatformCryptoProvider`] names whichever backend the current target uses.
//! Consumers hold an `Arc<dyn CryptoProvider>` and never name a backend.

use core::fmt;
use std::sync::Arc;

use crate::types::Fingerprint;
use crate::Result;

mod rust_crypto;
pub use rust_crypto::RustCryptoProvider;

#[cfg(all(feature = "native-crypto", not(target_arch = "wasm32")))]
mod native;
#[cfg(all(feature = "native-crypto", not(target_arch = "wasm32")))]
pub use native::RingCryptoProvider;

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Symmetric key length for both AEAD suites
pub const SYMMETRIC_KEY_LEN: usize = 32;

/// Nonce length for both AEAD suites
pub const AEAD_NONCE_LEN: usize = 12;

/// Authentication tag length for both AEAD suites
pub const AEAD_TAG_LEN: usize = 16;

/// X25519 key length (private, public and shared secret)
pub const X25519_KEY_LEN: usize = 32;

// ----------------------------------------------------------------------------
// Provider Trait
// ----------------------------------------------------------------------------

/// Portable set of cryptographic primitives
///
/// AEAD suite A is ChaCha20-Poly1305 with a caller supplied 12-byte nonce and
/// `ciphertext || tag` output. AEAD suite B is AES-256-GCM with a generated
/// nonce and self-describing `nonce || ciphertext || tag` output.
pub trait CryptoProvider: Send + Sync + fmt::Debug {
    /// Backend name for diagnostics
    fn name(&self) -> &'static str;

    /// Exactly `count` bytes from the OS CSPRNG
    fn random_bytes(&self, count: usize) -> Result<Vec<u8>>;

    /// SHA-256 digest
    fn sha256(&self, data: &[u8]) -> [u8; 32];

    /// HMAC-SHA256 of `data` under `key`
    fn hmac_sha256(&self, data: &[u8], key: &[u8]) -> Result<[u8; 32]>;

    /// Seal with ChaCha20-Poly1305, returning `ciphertext || tag`
    fn chacha_poly_encrypt(
        &self,
        plaintext: &[u8],
        key: &[u8],
        nonce: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>>;

    /// Open a `ciphertext || tag` sealed with ChaCha20-Poly1305
    fn chacha_poly_decrypt(
        &self,
        ciphertext: &[u8],
        key: &[u8],
        nonce: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>>;

    /// Seal with AES-256-GCM under a fresh nonce, returning `nonce || ciphertext || tag`
    fn aes_gcm_encrypt(&self, plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>>;

    /// Open a combined AES-256-GCM box
    fn aes_gcm_decrypt(&self, combined: &[u8], key: &[u8]) -> Result<Vec<u8>>;

    /// Generate a new X25519 private key
    fn generate_private_key(&self) -> Result<[u8; 32]>;

    /// Derive the X25519 public key for a private key
    fn public_key(&self, private_key: &[u8; 32]) -> [u8; 32];

    /// X25519 Diffie-Hellman
    fn shared_secret(&self, private_key: &[u8; 32], public_key: &[u8; 32]) -> Result<[u8; 32]>;

    /// PBKDF2-HMAC-SHA256
    fn pbkdf2_sha256(
        &self,
        password: &[u8],
        salt: &[u8],
        iterations: u32,
        key_len: usize,
    ) -> Result<Vec<u8>>;
}

// ----------------------------------------------------------------------------
// Backend Selection
// ----------------------------------------------------------------------------

cfg_if::cfg_if! {
    if #[cfg(all(feature = "native-crypto", not(target_arch = "wasm32")))] {
        /// Backend used on this target
        pub type PlatformCryptoProvider = RingCryptoProvider;
    } else {
        /// Backend used on this target
        pub type PlatformCryptoProvider = RustCryptoProvider;
    }
}

/// Shared handle to the platform backend
pub fn default_crypto_provider() -> Arc<dyn CryptoProvider> {
    Arc::new(PlatformCryptoProvider::default())
}

/// Generate a fingerprint (SHA-256) from a static public key
pub fn generate_fingerprint(crypto: &dyn CryptoProvider, public_key: &[u8]) -> Fingerprint {
    Fingerprint::new(crypto.sha256(public_key))
}

// ----------------------------------------------------------------------------
// Shared Validation
// ----------------------------------------------------------------------------

pub(crate) fn check_key(key: &[u8]) -> Result<()> {
    if key.len() != SYMMETRIC_KEY_LEN {
        return Err(crate::CryptographicError::InvalidKeyFormat {
            expected: SYMMETRIC_KEY_LEN,
            actual: key.len(),
        }
        .into());
    }
    Ok(())
}

pub(crate) fn check_nonce(nonce: &[u8]) -> Result<()> {
    if nonce.len() != AEAD_NONCE_LEN {
        return Err(crate::CryptographicError::InvalidNonceLength {
            expected: AEAD_NONCE_LEN,
            actual: nonce.len(),
        }
        .into());
    }
    Ok(())
}

pub(crate) fn check_kdf_params(iterations: u32, key_len: usize) -> Result<()> {
    if iterations == 0 || key_len == 0 {
        return Err(crate::CryptographicError::KeyDerivationFailed.into());
    }
    Ok(())
}
