//! Native backend built on `ring`
//!
//! `ring` has no API for importing a static X25519 private key, so key
//! agreement shares the `x25519-dalek` routine with the portable backend.

use core::num::NonZeroU32;

use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, CHACHA20_POLY1305};
use ring::rand::{SecureRandom, SystemRandom};
use ring::{digest, hmac, pbkdf2};

use super::rust_crypto::{x25519_public_key, x25519_shared_secret};
use super::{check_kdf_params, check_key, check_nonce, CryptoProvider, AEAD_NONCE_LEN, AEAD_TAG_LEN};
use crate::{CryptographicError, Result};

/// `ring` backed [`CryptoProvider`]
#[derive(Debug, Clone)]
pub struct RingCryptoProvider {
    rng: SystemRandom,
}

impl RingCryptoProvider {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }

    fn aead_key(
        &self,
        algorithm: &'static ring::aead::Algorithm,
        key: &[u8],
    ) -> Result<LessSafeKey> {
        check_key(key)?;
        let unbound = UnboundKey::new(algorithm, key).map_err(|_| {
            CryptographicError::InvalidKeyFormat {
                expected: algorithm.key_len(),
                actual: key.len(),
            }
        })?;
        Ok(LessSafeKey::new(unbound))
    }

    fn nonce(nonce: &[u8]) -> Result<Nonce> {
        check_nonce(nonce)?;
        Nonce::try_assume_unique_for_key(nonce).map_err(|_| {
            CryptographicError::InvalidNonceLength {
                expected: AEAD_NONCE_LEN,
                actual: nonce.len(),
            }
            .into()
        })
    }
}

impl Default for RingCryptoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptoProvider for RingCryptoProvider {
    fn name(&self) -> &'static str {
        "ring"
    }

    fn random_bytes(&self, count: usize) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; count];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| CryptographicError::RandomGenerationFailed)?;
        Ok(bytes)
    }

    fn sha256(&self, data: &[u8]) -> [u8; 32] {
        let hash = digest::digest(&digest::SHA256, data);
        let mut out = [0u8; 32];
        out.copy_from_slice(hash.as_ref());
        out
    }

    fn hmac_sha256(&self, data: &[u8], key: &[u8]) -> Result<[u8; 32]> {
        let key = hmac::Key::new(hmac::HMAC_SHA256, key);
        let tag = hmac::sign(&key, data);
        let mut out = [0u8; 32];
        out.copy_from_slice(tag.as_ref());
        Ok(out)
    }

    fn chacha_poly_encrypt(
        &self,
        plaintext: &[u8],
        key: &[u8],
        nonce: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        let key = self.aead_key(&CHACHA20_POLY1305, key)?;
        let nonce = Self::nonce(nonce)?;

        let mut in_out = plaintext.to_vec();
        key.seal_in_place_append_tag(nonce, Aad::from(aad), &mut in_out)
            .map_err(|_| CryptographicError::EncryptionFailed)?;
        Ok(in_out)
    }

    fn chacha_poly_decrypt(
        &self,
        ciphertext: &[u8],
        key: &[u8],
        nonce: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        let key = self.aead_key(&CHACHA20_POLY1305, key)?;
        let nonce = Self::nonce(nonce)?;
        if ciphertext.len() < AEAD_TAG_LEN {
            return Err(CryptographicError::DecryptionFailed.into());
        }

        let mut in_out = ciphertext.to_vec();
        let plaintext = key
            .open_in_place(nonce, Aad::from(aad), &mut in_out)
            .map_err(|_| CryptographicError::DecryptionFailed)?;
        Ok(plaintext.to_vec())
    }

    fn aes_gcm_encrypt(&self, plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>> {
        let key = self.aead_key(&AES_256_GCM, key)?;
        let nonce_bytes = self.random_bytes(AEAD_NONCE_LEN)?;
        let nonce = Self::nonce(&nonce_bytes)?;

        let mut in_out = plaintext.to_vec();
        key.seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| CryptographicError::EncryptionFailed)?;

        let mut combined = Vec::with_capacity(AEAD_NONCE_LEN + in_out.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&in_out);
        Ok(combined)
    }

    fn aes_gcm_decrypt(&self, combined: &[u8], key: &[u8]) -> Result<Vec<u8>> {
        let key = self.aead_key(&AES_256_GCM, key)?;
        if combined.len() < AEAD_NONCE_LEN + AEAD_TAG_LEN {
            return Err(CryptographicError::DecryptionFailed.into());
        }

        let (nonce_bytes, sealed) = combined.split_at(AEAD_NONCE_LEN);
        let nonce = Self::nonce(nonce_bytes)?;
        let mut in_out = sealed.to_vec();
        let plaintext = key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| CryptographicError::DecryptionFailed)?;
        Ok(plaintext.to_vec())
    }

    fn generate_private_key(&self) -> Result<[u8; 32]> {
        let mut private_key = [0u8; 32];
        self.rng
            .fill(&mut private_key)
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
        let iterations =
            NonZeroU32::new(iterations).ok_or(CryptographicError::KeyDerivationFailed)?;

        let mut derived = vec![0u8; key_len];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            iterations,
            salt,
            password,
            &mut derived,
        );
        Ok(derived)
    }
}
