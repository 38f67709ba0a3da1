//! Portable backend built on the RustCrypto crates and `x25519-dalek`

use aes_gcm::Aes256Gcm;
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::ChaCha20Poly1305;
use hmac::{Hmac, Mac};
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};
use x25519_dalek::{PublicKey, StaticSecret};

use super::{check_kdf_params, check_key, check_nonce, CryptoProvider, AEAD_NONCE_LEN, AEAD_TAG_LEN};
use crate::{CryptographicError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Pure Rust [`CryptoProvider`]
#[derive(Debug, Clone, Copy, Default)]
pub struct RustCryptoProvider;

impl RustCryptoProvider {
    pub fn new() -> Self {
        Self
    }
}

impl CryptoProvider for RustCryptoProvider {
    fn name(&self) -> &'static str {
        "rustcrypto"
    }

    fn random_bytes(&self, count: usize) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; count];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|_| CryptographicError::RandomGenerationFailed)?;
        Ok(bytes)
    }

    fn sha256(&self, data: &[u8]) -> [u8; 32] {
        Sha256::digest(data).into()
    }

    fn hmac_sha256(&self, data: &[u8], key: &[u8]) -> Result<[u8; 32]> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
            .map_err(|_| CryptographicError::InvalidKeyFormat {
                expected: 32,
                actual: key.len(),
            })?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().into())
    }

    fn chacha_poly_encrypt(
        &self,
        plaintext: &[u8],
        key: &[u8],
        nonce: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        check_key(key)?;
        check_nonce(nonce)?;

        let cipher = ChaCha20Poly1305::new_from_slice(key)
            .map_err(|_| CryptographicError::EncryptionFailed)?;
        cipher
            .encrypt(nonce.into(), Payload { msg: plaintext, aad })
            .map_err(|_| CryptographicError::EncryptionFailed.into())
    }

    fn chacha_poly_decrypt(
        &self,
        ciphertext: &[u8],
        key: &[u8],
        nonce: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        check_key(key)?;
        check_nonce(nonce)?;
        if ciphertext.len() < AEAD_TAG_LEN {
            return Err(CryptographicError::DecryptionFailed.into());
        }

        let cipher = ChaCha20Poly1305::new_from_slice(key)
            .map_err(|_| CryptographicError::DecryptionFailed)?;
        cipher
            .decrypt(nonce.into(), Payload { msg: ciphertext, aad })
            .map_err(|_| CryptographicError::DecryptionFailed.into())
    }

    fn aes_gcm_encrypt(&self, plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>> {
        check_key(key)?;

        let cipher =
            Aes256Gcm::new_from_slice(key).map_err(|_| CryptographicError::EncryptionFailed)?;
        let nonce = self.random_bytes(AEAD_NONCE_LEN)?;
        let sealed = cipher
            .encrypt(nonce.as_slice().into(), plaintext)
            .map_err(|_| CryptographicError::EncryptionFailed)?;

        let mut combined = Vec::with_capacity(AEAD_NONCE_LEN + sealed.len());
        combined.extend_from_slice(&nonce);
        combined.extend_from_slice(&sealed);
        Ok(combined)
    }

    fn aes_gcm_decrypt(&self, combined: &[u8], key: &[u8]) -> Result<Vec<u8>> {
        check_key(key)?;
        if combined.len() < AEAD_NONCE_LEN + AEAD_TAG_LEN {
            return Err(CryptographicError::DecryptionFailed.into());
        }

        let cipher =
            Aes256Gcm::new_from_slice(key).map_err(|_| CryptographicError::DecryptionFailed)?;
        let (nonce, sealed) = combined.split_at(AEAD_NONCE_LEN);
        cipher
            .decrypt(nonce.into(), sealed)
            .map_err(|_| CryptographicError::DecryptionFailed.into())
    }

    fn generate_private_key(&self) -> Result<[u8; 32]> {
        let mut private_key = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut private_key)
            .map_err(|_| CryptographicError::RandomGenerationFailed)?;
        Ok(private_key)
    }

    fn public_key(&self, private_key: &[u8; 32]) -> [u8; 32] {
        x25519_public_key(private_key)
    }

    fn shared_secret(&self, private_key: &[u8; 32], public_key: &[u8; 32]) -> Result<[u8; 32]> {
        x25519_shared_secret(private_key, public_key)
    }

    fn pbkdf2_sha256(
        &self,
        password: &[u8],
        salt: &[u8],
        iterations: u32,
        key_len: usize,
    ) -> Result<Vec<u8>> {
        check_kdf_params(iterations, key_len)?;

        let mut derived = vec![0u8; key_len];
        pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut derived);
        Ok(derived)
    }
}

// ----------------------------------------------------------------------------
// X25519 (shared with the native backend)
// ----------------------------------------------------------------------------

pub(crate) fn x25519_public_key(private_key: &[u8; 32]) -> [u8; 32] {
    let secret = StaticSecret::from(*private_key);
    PublicKey::from(&secret).to_bytes()
}

pub(crate) fn x25519_shared_secret(private_key: &[u8; 32], public_key: &[u8; 32]) -> Result<[u8; 32]> {
    let secret = StaticSecret::from(*private_key);
    let shared = secret.diffie_hellman(&PublicKey::from(*public_key));
    if !shared.was_contributory() {
        return Err(CryptographicError::KeyAgreementFailed.into());
    }
    Ok(shared.to_bytes())
}
