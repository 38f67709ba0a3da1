//! Shared helpers for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bitchat_security::{
    default_crypto_provider, storage::create_test_storage, ChannelEncryptionConfig,
    CryptoProvider, IdentityStoreConfig, MemoryStorage, NoiseChannelEncryption, Result,
    SecureIdentityStateManager, TimeSource, Timestamp,
};
use tokio::sync::oneshot;

/// Manually advanced clock
#[derive(Debug)]
pub struct MockTimeSource {
    millis: AtomicU64,
}

impl MockTimeSource {
    pub fn new(start: Timestamp) -> Arc<Self> {
        Arc::new(Self {
            millis: AtomicU64::new(start.as_millis()),
        })
    }

    pub fn advance_secs(&self, seconds: u64) {
        self.millis.fetch_add(seconds * 1000, Ordering::SeqCst);
    }

    pub fn set(&self, at: Timestamp) {
        self.millis.store(at.as_millis(), Ordering::SeqCst);
    }
}

impl TimeSource for MockTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.millis.load(Ordering::SeqCst))
    }
}

pub const START: Timestamp = Timestamp::new(1_700_000_000_000);

pub fn identity_manager(storage: Arc<MemoryStorage>, clock: Arc<MockTimeSource>) -> SecureIdentityStateManager {
    SecureIdentityStateManager::with_time_source(
        storage,
        default_crypto_provider(),
        IdentityStoreConfig::default(),
        clock,
    )
}

pub fn channel_layer(storage: Arc<MemoryStorage>, clock: Arc<MockTimeSource>) -> NoiseChannelEncryption {
    NoiseChannelEncryption::with_config(
        default_crypto_provider(),
        storage,
        ChannelEncryptionConfig::testing(),
        clock,
    )
}

pub fn fresh_storage() -> Arc<MemoryStorage> {
    create_test_storage()
}

/// Platform crypto whose key derivation for one password parks until released
///
/// Lets a test interleave other channel operations with an in-flight derivation.
#[derive(Debug)]
pub struct GatedKdfProvider {
    inner: Arc<dyn CryptoProvider>,
    gated_password: Vec<u8>,
    entered: Mutex<Option<oneshot::Sender<()>>>,
    release: Mutex<Option<oneshot::Receiver<()>>>,
}

impl GatedKdfProvider {
    /// Returns the provider, a receiver fired when the gated derivation starts
    /// and a sender that lets it finish
    pub fn new(gated_password: &str) -> (Arc<Self>, oneshot::Receiver<()>, oneshot::Sender<()>) {
        let (entered_tx, entered_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        let provider = Arc::new(Self {
            inner: default_crypto_provider(),
            gated_password: gated_password.as_bytes().to_vec(),
            entered: Mutex::new(Some(entered_tx)),
            release: Mutex::new(Some(release_rx)),
        });
        (provider, entered_rx, release_tx)
    }
}

impl CryptoProvider for GatedKdfProvider {
    fn name(&self) -> &'static str {
        "gated"
    }

    fn random_bytes(&self, count: usize) -> Result<Vec<u8>> {
        self.inner.random_bytes(count)
    }

    fn sha256(&self, data: &[u8]) -> [u8; 32] {
        self.inner.sha256(data)
    }

    fn hmac_sha256(&self, data: &[u8], key: &[u8]) -> Result<[u8; 32]> {
        self.inner.hmac_sha256(data, key)
    }

    fn chacha_poly_encrypt(&self, plaintext: &[u8], key: &[u8], nonce: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        self.inner.chacha_poly_encrypt(plaintext, key, nonce, aad)
    }

    fn chacha_poly_decrypt(&self, ciphertext: &[u8], key: &[u8], nonce: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        self.inner.chacha_poly_decrypt(ciphertext, key, nonce, aad)
    }

    fn aes_gcm_encrypt(&self, plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>> {
        self.inner.aes_gcm_encrypt(plaintext, key)
    }

    fn aes_gcm_decrypt(&self, combined: &[u8], key: &[u8]) -> Result<Vec<u8>> {
        self.inner.aes_gcm_decrypt(combined, key)
    }

    fn generate_private_key(&self) -> Result<[u8; 32]> {
        self.inner.generate_private_key()
    }

    fn public_key(&self, private_key: &[u8; 32]) -> [u8; 32] {
        self.inner.public_key(private_key)
    }

    fn shared_secret(&self, private_key: &[u8; 32], public_key: &[u8; 32]) -> Result<[u8; 32]> {
        self.inner.shared_secret(private_key, public_key)
    }

    fn pbkdf2_sha256(&self, password: &[u8], salt: &[u8], iterations: u32, key_len: usize) -> Result<Vec<u8>> {
        if password == self.gated_password.as_slice() {
            if let Some(entered) = self.entered.lock().unwrap().take() {
                let _ = entered.send(());
                let release = self.release.lock().unwrap().take();
                if let Some(release) = release {
                    let _ = release.blocking_recv();
                }
            }
        }
        self.inner.pbkdf2_sha256(password, salt, iterations, key_len)
    }
}

pub fn gated_channel_layer(storage: Arc<MemoryStorage>, crypto: Arc<GatedKdfProvider>) -> NoiseChannelEncryption {
    NoiseChannelEncryption::with_config(
        crypto,
        storage,
        ChannelEncryptionConfig::testing(),
        MockTimeSource::new(START),
    )
}
