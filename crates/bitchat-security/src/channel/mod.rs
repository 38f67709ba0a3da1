//! Password-protected channel encryption
//!
//! Channel keys are derived from a shared password with PBKDF2-HMAC-SHA256,
//! salted with the channel name (and optionally the creator's fingerprint).
//! Messages are sealed with ChaCha20-Poly1305 as `nonce(12) ∥ ciphertext ∥ tag(16)`.
//!
//! Passwords travel between peers as [`ChannelKeyPacket`]s inside an already
//! encrypted session. Stale or replayed packets are dropped and logged as
//! security events; they are never surfaced as errors.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::{
    config::ChannelEncryptionConfig,
    crypto::{default_crypto_provider, CryptoProvider, AEAD_NONCE_LEN, AEAD_TAG_LEN, SYMMETRIC_KEY_LEN},
    errors::{ChannelEncryptionError, CryptographicError},
    security_event,
    storage::{channel_from_key, channel_key, create_test_storage, SecureStorage},
    types::{Fingerprint, SystemTimeSource, TimeSource},
    BitchatError, Result,
};

mod packet;

pub use packet::{ChannelKeyPacket, KEY_PACKET_NONCE_LEN};
use packet::StoredChannelPassword;

/// Smallest well-formed channel message: nonce plus tag
pub const MIN_CHANNEL_CIPHERTEXT_LEN: usize = AEAD_NONCE_LEN + AEAD_TAG_LEN;

/// Derived symmetric channel key
pub type ChannelKey = Zeroizing<[u8; SYMMETRIC_KEY_LEN]>;

/// Salt binding a derived key to one channel instance
pub fn channel_salt(channel: &str, creator: Option<&Fingerprint>) -> String {
    match creator {
        Some(fingerprint) => format!("bitchat-channel-{channel}-{fingerprint}"),
        None => format!("bitchat-channel-{channel}"),
    }
}

/// Everything guarded by the channel lock
#[derive(Debug, Default)]
struct ChannelState {
    keys: HashMap<String, ChannelKey>,
    rotation_enabled: HashMap<String, bool>,
    received_nonces: HashSet<String>,
}

// ----------------------------------------------------------------------------
// Channel Encryption
// ----------------------------------------------------------------------------

/// Channel key store, message sealing and key-packet exchange
///
/// Independent of the identity manager: it has its own lock, so channel
/// traffic never contends with identity updates.
#[derive(Debug)]
pub struct NoiseChannelEncryption {
    crypto: Arc<dyn CryptoProvider>,
    storage: Arc<dyn SecureStorage>,
    time_source: Arc<dyn TimeSource>,
    config: ChannelEncryptionConfig,
    state: Arc<RwLock<ChannelState>>,
    cleanup_task: Mutex<Option<JoinHandle<()>>>,
}

impl NoiseChannelEncryption {
    /// Create with production parameters
    pub fn new(crypto: Arc<dyn CryptoProvider>, storage: Arc<dyn SecureStorage>) -> Self {
        Self::with_config(
            crypto,
            storage,
            ChannelEncryptionConfig::default(),
            Arc::new(SystemTimeSource),
        )
    }

    /// Create for testing (in-memory storage, cheap key derivation)
    pub fn new_for_testing() -> Self {
        Self::with_config(
            default_crypto_provider(),
            create_test_storage(),
            ChannelEncryptionConfig::testing(),
            Arc::new(SystemTimeSource),
        )
    }

    /// Create with explicit parameters and clock
    pub fn with_config(
        crypto: Arc<dyn CryptoProvider>,
        storage: Arc<dyn SecureStorage>,
        config: ChannelEncryptionConfig,
        time_source: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            crypto,
            storage,
            time_source,
            config,
            state: Arc::new(RwLock::new(ChannelState::default())),
            cleanup_task: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ChannelEncryptionConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Key Management
    // ------------------------------------------------------------------------

    /// Derive the key for a channel password
    ///
    /// CPU-bound; runs on the blocking pool.
    pub async fn derive_channel_key(
        &self,
        password: &str,
        channel: &str,
        creator: Option<&Fingerprint>,
    ) -> Result<ChannelKey> {
        let crypto = Arc::clone(&self.crypto);
        let password = Zeroizing::new(password.to_string());
        let salt = channel_salt(channel, creator);
        let iterations = self.config.pbkdf2_iterations;
        let key_len = self.config.derived_key_len;

        let derived = tokio::task::spawn_blocking(move || {
            crypto.pbkdf2_sha256(password.as_bytes(), salt.as_bytes(), iterations, key_len)
        })
        .await
        .map_err(|err| BitchatError::task_failed(format!("key derivation worker: {err}")))??;

        let derived = Zeroizing::new(derived);
        <[u8; SYMMETRIC_KEY_LEN]>::try_from(derived.as_slice())
            .map(Zeroizing::new)
            .map_err(|_| {
                BitchatError::from(CryptographicError::InvalidKeyFormat {
                    expected: SYMMETRIC_KEY_LEN,
                    actual: derived.len(),
                })
            })
    }

    /// Derive and cache the key, and store the password for later re-derivation
    pub async fn set_channel_password(
        &self,
        password: &str,
        channel: &str,
        creator: Option<&Fingerprint>,
    ) -> Result<()> {
        let key = self.derive_channel_key(password, channel, creator).await?;
        let record = StoredChannelPassword::new(password, creator).encode()?;

        let mut state = self.state.write().await;
        state.keys.insert(channel.to_string(), key);
        self.storage.store(&channel_key(channel), &record)?;

        debug!(channel, has_creator = creator.is_some(), "Channel password set");
        Ok(())
    }

    /// Re-derive a channel key from its stored password
    ///
    /// Returns `false` when nothing usable is stored for the channel. The key is
    /// derived outside the lock and only cached if the stored record is still
    /// the one it was derived from; a concurrent set or remove wins.
    pub async fn load_channel_password(&self, channel: &str) -> Result<bool> {
        let Some(mut record) = self.stored_record(channel)? else {
            return Ok(false);
        };

        loop {
            let creator = record.creator();
            let key = self
                .derive_channel_key(&record.password, channel, creator.as_ref())
                .await?;

            let mut state = self.state.write().await;
            match self.stored_record(channel)? {
                Some(current) if current == record => {
                    state.keys.insert(channel.to_string(), key);
                    debug!(channel, "Channel key restored from storage");
                    return Ok(true);
                }
                Some(current) => {
                    drop(state);
                    debug!(channel, "Stored channel password changed during load, re-deriving");
                    record = current;
                }
                None => {
                    debug!(channel, "Channel password removed during load");
                    return Ok(false);
                }
            }
        }
    }

    /// Restore every channel with a stored password; returns how many loaded
    pub async fn load_all_channel_passwords(&self) -> Result<usize> {
        let mut loaded = 0;
        for channel in self.stored_channels()? {
            if self.load_channel_password(&channel).await? {
                loaded += 1;
            }
        }
        Ok(loaded)
    }

    /// Channels that have a password in storage
    pub fn stored_channels(&self) -> Result<Vec<String>> {
        Ok(self
            .storage
            .list_keys()?
            .iter()
            .filter_map(|key| channel_from_key(key))
            .map(str::to_string)
            .collect())
    }

    /// Key packet sharing the stored password of a channel
    pub fn share_stored_password(&self, channel: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .stored_record(channel)?
            .and_then(|record| self.create_channel_key_packet(&record.password, channel)))
    }

    fn stored_record(&self, channel: &str) -> Result<Option<StoredChannelPassword>> {
        let Some(bytes) = self.storage.retrieve(&channel_key(channel))? else {
            return Ok(None);
        };
        let bytes = Zeroizing::new(bytes);
        let record = StoredChannelPassword::decode(&bytes);
        if record.is_none() {
            warn!(channel, "Stored channel password is not valid UTF-8, ignoring");
        }
        Ok(record)
    }

    /// Forget a channel key and its stored password
    pub async fn remove_channel_password(&self, channel: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.keys.remove(channel);
        state.rotation_enabled.remove(channel);
        self.storage.delete(&channel_key(channel))?;
        debug!(channel, "Channel password removed");
        Ok(())
    }

    pub async fn has_channel_key(&self, channel: &str) -> bool {
        self.state.read().await.keys.contains_key(channel)
    }

    /// Copy of the cached key for a channel
    pub async fn get_channel_key(&self, channel: &str) -> Option<ChannelKey> {
        self.state.read().await.keys.get(channel).cloned()
    }

    /// Channels with a key in memory
    pub async fn channels(&self) -> Vec<String> {
        let mut channels: Vec<_> = self.state.read().await.keys.keys().cloned().collect();
        channels.sort();
        channels
    }

    // ------------------------------------------------------------------------
    // Message Encryption
    // ------------------------------------------------------------------------

    /// Seal a UTF-8 message for a channel
    pub async fn encrypt_channel_message(&self, message: &str, channel: &str) -> Result<Vec<u8>> {
        let state = self.state.read().await;
        let key = state
            .keys
            .get(channel)
            .ok_or_else(|| BitchatError::no_channel_key(channel))?;

        let nonce = self.crypto.random_bytes(AEAD_NONCE_LEN)?;
        let sealed = self
            .crypto
            .chacha_poly_encrypt(message.as_bytes(), key.as_slice(), &nonce, &[])?;

        let mut output = Vec::with_capacity(nonce.len() + sealed.len());
        output.extend_from_slice(&nonce);
        output.extend_from_slice(&sealed);
        Ok(output)
    }

    /// Open a channel message produced by [`Self::encrypt_channel_message`]
    pub async fn decrypt_channel_message(&self, data: &[u8], channel: &str) -> Result<String> {
        let state = self.state.read().await;
        let key = state
            .keys
            .get(channel)
            .ok_or_else(|| BitchatError::no_channel_key(channel))?;

        if data.len() < MIN_CHANNEL_CIPHERTEXT_LEN {
            return Err(ChannelEncryptionError::InvalidCiphertext { length: data.len() }.into());
        }

        let (nonce, sealed) = data.split_at(AEAD_NONCE_LEN);
        let plaintext = self
            .crypto
            .chacha_poly_decrypt(sealed, key.as_slice(), nonce, &[])
            .map_err(|_| ChannelEncryptionError::DecryptionFailed)?;

        String::from_utf8(plaintext)
            .map_err(|_| BitchatError::from(ChannelEncryptionError::DecryptionFailed))
    }

    // ------------------------------------------------------------------------
    // Key Packets
    // ------------------------------------------------------------------------

    /// Build a key packet sharing `password` for `channel`
    pub fn create_channel_key_packet(&self, password: &str, channel: &str) -> Option<Vec<u8>> {
        let nonce = match self.crypto.random_bytes(KEY_PACKET_NONCE_LEN) {
            Ok(bytes) => BASE64.encode(bytes),
            Err(err) => {
                warn!(error = %err, "Could not generate key packet nonce");
                return None;
            }
        };

        let packet = ChannelKeyPacket {
            channel: channel.to_string(),
            password: password.to_string(),
            timestamp: self.time_source.now(),
            nonce,
        };
        match packet.encode() {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                warn!(error = %err, "Could not serialize key packet");
                None
            }
        }
    }

    /// Accept a key packet, returning `(channel, password)`
    ///
    /// Malformed, stale and replayed packets yield `None`.
    pub async fn process_channel_key_packet(&self, data: &[u8]) -> Option<(String, String)> {
        self.ensure_cleanup_task();

        let packet = match ChannelKeyPacket::decode(data) {
            Ok(packet) => packet,
            Err(err) => {
                debug!(error = %err, "Dropping malformed key packet");
                return None;
            }
        };

        let age = packet.age(self.time_source.now());
        if age >= self.config.key_packet_max_age() {
            security_event!(
                warn,
                channel = %packet.channel,
                age_secs = age.as_secs(),
                "Rejected stale channel key packet"
            );
            return None;
        }

        let mut state = self.state.write().await;
        if !state.received_nonces.insert(packet.nonce.clone()) {
            security_event!(warn, channel = %packet.channel, "Rejected replayed channel key packet");
            return None;
        }
        drop(state);

        debug!(channel = %packet.channel, "Accepted channel key packet");
        Some((packet.channel, packet.password))
    }

    // ------------------------------------------------------------------------
    // Key Rotation Gate
    // ------------------------------------------------------------------------

    /// Mark rotation active or inactive for a channel
    pub async fn set_rotation_enabled(&self, channel: &str, enabled: bool) {
        self.state
            .write()
            .await
            .rotation_enabled
            .insert(channel.to_string(), enabled);
    }

    pub async fn is_rotation_enabled(&self, channel: &str) -> bool {
        self.state
            .read()
            .await
            .rotation_enabled
            .get(channel)
            .copied()
            .unwrap_or(false)
    }

    // ------------------------------------------------------------------------
    // Replay Nonce Cleanup
    // ------------------------------------------------------------------------

    /// Number of key-packet nonces remembered for replay detection
    pub async fn tracked_nonce_count(&self) -> usize {
        self.state.read().await.received_nonces.len()
    }

    /// Run one cleanup pass now; returns how many nonces were dropped
    pub async fn cleanup_nonces(&self) -> usize {
        let mut state = self.state.write().await;
        prune_nonces(&mut state, self.config.max_tracked_nonces)
    }

    /// Whether the periodic cleanup task is alive
    pub fn is_cleanup_running(&self) -> bool {
        self.lock_cleanup_task()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the periodic cleanup task
    ///
    /// Processing another key packet starts it again.
    pub fn shutdown(&self) {
        if let Some(handle) = self.lock_cleanup_task().take() {
            handle.abort();
            debug!("Nonce cleanup task stopped");
        }
    }

    fn lock_cleanup_task(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.cleanup_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn the cleanup task on first use
    fn ensure_cleanup_task(&self) {
        let mut slot = self.lock_cleanup_task();
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("No tokio runtime, nonce cleanup task not started");
            return;
        };

        let state = Arc::downgrade(&self.state);
        let period = self.config.nonce_cleanup_interval();
        let max_tracked = self.config.max_tracked_nonces;
        *slot = Some(runtime.spawn(run_nonce_cleanup(state, period, max_tracked)));
        debug!(period_secs = period.as_secs(), "Nonce cleanup task started");
    }
}

impl Drop for NoiseChannelEncryption {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_nonce_cleanup(state: Weak<RwLock<ChannelState>>, period: core::time::Duration, max_tracked: usize) {
    let start = tokio::time::Instant::now() + period;
    let mut interval = tokio::time::interval_at(start, period);
    loop {
        interval.tick().await;
        let Some(shared) = state.upgrade() else {
            break;
        };
        let mut guard = shared.write().await;
        prune_nonces(&mut guard, max_tracked);
    }
}

/// Clear the replay set wholesale once it exceeds `max_tracked`
fn prune_nonces(state: &mut ChannelState, max_tracked: usize) -> usize {
    let tracked = state.received_nonces.len();
    if tracked <= max_tracked {
        return 0;
    }
    state.received_nonces.clear();
    security_event!(info, cleared = tracked, "Cleared replay nonce set");
    tracked
}
