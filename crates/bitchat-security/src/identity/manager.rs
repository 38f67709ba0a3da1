//! Secure Identity State Manager
//!
//! Correlates connection-scoped transport peers with durable fingerprints and
//! keeps the encrypted identity cache written through to secure storage.
//!
//! All state lives behind one `tokio::sync::RwLock`. Reads share the lock;
//! every mutation holds the write half until the re-encrypted cache has been
//! stored, so no reader can observe a half-applied or unpersisted change.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::{
    EphemeralIdentity, HandshakeState, IdentityCache, IdentityCacheStats, IdentityHint,
    PendingActions, SocialIdentity, TrustLevel,
};
use crate::{
    config::IdentityStoreConfig,
    crypto::{default_crypto_provider, CryptoProvider, SYMMETRIC_KEY_LEN},
    errors::CryptographicError,
    security_event,
    storage::{create_test_storage, identity_key, SecureStorage},
    types::{Fingerprint, PeerId, SystemTimeSource, TimeSource, Timestamp},
    Result,
};

type CacheKey = Zeroizing<[u8; SYMMETRIC_KEY_LEN]>;

/// Everything guarded by the identity lock
#[derive(Debug, Default)]
struct IdentityState {
    cache: IdentityCache,
    ephemeral_sessions: HashMap<PeerId, EphemeralIdentity>,
    pending_actions: HashMap<PeerId, PendingActions>,
    /// `None` until a key could be loaded or generated
    cache_key: Option<CacheKey>,
}

/// Secure identity state manager
///
/// Construct once at startup and share behind an `Arc`.
#[derive(Debug)]
pub struct SecureIdentityStateManager {
    state: RwLock<IdentityState>,
    storage: Arc<dyn SecureStorage>,
    crypto: Arc<dyn CryptoProvider>,
    time_source: Arc<dyn TimeSource>,
    config: IdentityStoreConfig,
}

impl SecureIdentityStateManager {
    /// Create a manager with the default store layout
    pub fn new(storage: Arc<dyn SecureStorage>, crypto: Arc<dyn CryptoProvider>) -> Self {
        Self::with_storage(storage, crypto, IdentityStoreConfig::default())
    }

    /// Create a manager for testing (in-memory storage, platform crypto)
    pub fn new_for_testing() -> Self {
        Self::new(create_test_storage(), default_crypto_provider())
    }

    /// Create with custom storage and configuration
    pub fn with_storage(
        storage: Arc<dyn SecureStorage>,
        crypto: Arc<dyn CryptoProvider>,
        config: IdentityStoreConfig,
    ) -> Self {
        Self::with_time_source(storage, crypto, config, Arc::new(SystemTimeSource))
    }

    /// Create with an explicit clock
    ///
    /// Never fails: an unreadable key is replaced and an unreadable cache blob
    /// is discarded in favour of an empty cache.
    pub fn with_time_source(
        storage: Arc<dyn SecureStorage>,
        crypto: Arc<dyn CryptoProvider>,
        config: IdentityStoreConfig,
        time_source: Arc<dyn TimeSource>,
    ) -> Self {
        let mut manager = Self {
            state: RwLock::new(IdentityState::default()),
            storage,
            crypto,
            time_source,
            config,
        };

        let cache_key = manager.load_or_create_key();
        let cache = manager.load_cache(cache_key.as_ref());
        debug!(
            identities = cache.social_identities().len(),
            has_key = cache_key.is_some(),
            "Identity state manager ready"
        );

        manager.state = RwLock::new(IdentityState {
            cache,
            cache_key,
            ..IdentityState::default()
        });
        manager
    }

    // ------------------------------------------------------------------------
    // Ephemeral Sessions
    // ------------------------------------------------------------------------

    /// Register a transport connection; re-registering keeps the existing record
    pub async fn register_ephemeral_session(&self, peer_id: PeerId, initial_state: HandshakeState) {
        let now = self.time_source.now();
        let mut state = self.state.write().await;
        state
            .ephemeral_sessions
            .entry(peer_id)
            .or_insert_with(|| EphemeralIdentity::new(peer_id, now, initial_state));
    }

    /// Update the handshake state of a registered session
    ///
    /// A transition to `Completed` records the interaction time for the
    /// fingerprint and persists the cache. Pending actions are *not* applied
    /// here; call [`Self::apply_pending_actions`] afterwards.
    pub async fn update_handshake_state(&self, peer_id: &PeerId, handshake: HandshakeState) -> Result<()> {
        let now = self.time_source.now();
        let mut state = self.state.write().await;

        let session = state
            .ephemeral_sessions
            .get_mut(peer_id)
            .ok_or_else(|| crate::BitchatError::session_not_found(peer_id.to_string()))?;
        session.set_handshake_state(handshake.clone());

        match handshake {
            HandshakeState::Completed { fingerprint } => {
                debug!(peer = %peer_id, fingerprint = %fingerprint.short(), "Handshake completed");
                state.cache.record_interaction(fingerprint, now);
                self.persist(&mut state)
            }
            HandshakeState::None => Ok(()),
        }
    }

    /// Current handshake state of a session
    pub async fn get_handshake_state(&self, peer_id: &PeerId) -> Option<HandshakeState> {
        let state = self.state.read().await;
        state
            .ephemeral_sessions
            .get(peer_id)
            .map(|session| session.handshake_state.clone())
    }

    /// Drop a session together with any intent still queued for it
    pub async fn remove_ephemeral_session(&self, peer_id: &PeerId) {
        let mut state = self.state.write().await;
        state.ephemeral_sessions.remove(peer_id);
        if state.pending_actions.remove(peer_id).is_some() {
            debug!(peer = %peer_id, "Discarded pending actions for closed session");
        }
    }

    /// Number of live sessions
    pub async fn ephemeral_session_count(&self) -> usize {
        self.state.read().await.ephemeral_sessions.len()
    }

    // ------------------------------------------------------------------------
    // Resolution and Pending Actions
    // ------------------------------------------------------------------------

    /// Guess who a transport peer is from the nickname it claims
    ///
    /// The result is a hint for the UI; it never authenticates anyone.
    pub async fn resolve_identity(&self, peer_id: &PeerId, claimed_nickname: &str) -> IdentityHint {
        let state = self.state.read().await;
        let hint = IdentityHint::from_candidates(state.cache.candidates_for_nickname(claimed_nickname));
        debug!(peer = %peer_id, hint = hint.kind(), "Resolved identity hint");
        hint
    }

    /// Queue user intent for a peer whose fingerprint is not known yet
    pub async fn set_pending_action(&self, peer_id: PeerId, actions: PendingActions) {
        let mut state = self.state.write().await;
        if actions.is_empty() {
            state.pending_actions.remove(&peer_id);
        } else {
            state.pending_actions.insert(peer_id, actions);
        }
    }

    /// Intent queued for a peer, if any
    pub async fn get_pending_actions(&self, peer_id: &PeerId) -> Option<PendingActions> {
        self.state.read().await.pending_actions.get(peer_id).cloned()
    }

    /// Apply the intent queued for `peer_id` to `fingerprint`
    ///
    /// No-op when nothing is queued. The queue entry is consumed either way.
    pub async fn apply_pending_actions(&self, peer_id: &PeerId, fingerprint: &Fingerprint) -> Result<()> {
        let mut state = self.state.write().await;
        let Some(actions) = state.pending_actions.remove(peer_id) else {
            return Ok(());
        };

        if let Some(level) = actions.set_trust_level {
            state.cache.set_trust_level(fingerprint, level);
        }
        state.cache.update_social_identity_with(fingerprint, |social| {
            if let Some(favorite) = actions.toggle_favorite {
                social.set_favorite(favorite);
            }
            if let Some(petname) = actions.set_petname {
                social.set_petname(Some(petname));
            }
        });

        debug!(peer = %peer_id, fingerprint = %fingerprint.short(), "Applied pending actions");
        self.persist(&mut state)
    }

    // ------------------------------------------------------------------------
    // Social Identity Management
    // ------------------------------------------------------------------------

    /// Insert or replace a social identity
    pub async fn update_social_identity(&self, identity: SocialIdentity) -> Result<()> {
        let mut state = self.state.write().await;
        state.cache.upsert_social_identity(identity);
        self.persist(&mut state)
    }

    /// Forget everything known about a fingerprint
    pub async fn remove_social_identity(&self, fingerprint: &Fingerprint) -> Result<Option<SocialIdentity>> {
        let mut state = self.state.write().await;
        let removed = state.cache.remove_social_identity(fingerprint);
        self.persist(&mut state)?;
        Ok(removed)
    }

    /// Mark or unmark as favorite
    pub async fn set_favorite(&self, fingerprint: &Fingerprint, favorite: bool) -> Result<()> {
        self.modify_social(fingerprint, |social| social.set_favorite(favorite))
            .await
    }

    /// Block or unblock
    pub async fn set_blocked(&self, fingerprint: &Fingerprint, blocked: bool) -> Result<()> {
        self.modify_social(fingerprint, |social| social.set_blocked(blocked))
            .await
    }

    /// Set or clear the local petname
    pub async fn set_petname(&self, fingerprint: &Fingerprint, petname: Option<String>) -> Result<()> {
        self.modify_social(fingerprint, |social| social.set_petname(petname))
            .await
    }

    /// Set verification status
    pub async fn set_verified(&self, fingerprint: &Fingerprint, verified: bool) -> Result<()> {
        let mut state = self.state.write().await;
        state.cache.set_verified(fingerprint, verified);
        security_event!(info, fingerprint = %fingerprint.short(), verified, "Verification changed");
        self.persist(&mut state)
    }

    /// Set trust level
    pub async fn set_trust_level(&self, fingerprint: &Fingerprint, level: TrustLevel) -> Result<()> {
        let mut state = self.state.write().await;
        state.cache.set_trust_level(fingerprint, level);
        self.persist(&mut state)
    }

    /// Get social identity by fingerprint
    pub async fn get_social_identity(&self, fingerprint: &Fingerprint) -> Option<SocialIdentity> {
        self.state
            .read()
            .await
            .cache
            .get_social_identity(fingerprint)
            .cloned()
    }

    /// All social identities, ordered by fingerprint
    pub async fn get_all_social_identities(&self) -> Vec<SocialIdentity> {
        self.state
            .read()
            .await
            .cache
            .social_identities()
            .values()
            .cloned()
            .collect()
    }

    pub async fn get_favorites(&self) -> BTreeSet<Fingerprint> {
        self.state.read().await.cache.favorites()
    }

    pub async fn is_favorite(&self, fingerprint: &Fingerprint) -> bool {
        self.state
            .read()
            .await
            .cache
            .get_social_identity(fingerprint)
            .is_some_and(|social| social.is_favorite)
    }

    pub async fn is_blocked(&self, fingerprint: &Fingerprint) -> bool {
        self.state
            .read()
            .await
            .cache
            .get_social_identity(fingerprint)
            .is_some_and(|social| social.is_blocked)
    }

    pub async fn is_verified(&self, fingerprint: &Fingerprint) -> bool {
        self.state.read().await.cache.is_verified(fingerprint)
    }

    pub async fn get_verified_fingerprints(&self) -> BTreeSet<Fingerprint> {
        self.state.read().await.cache.verified_fingerprints().clone()
    }

    /// Petname if set, otherwise the claimed nickname
    pub async fn get_display_name(&self, fingerprint: &Fingerprint) -> Option<String> {
        self.state
            .read()
            .await
            .cache
            .get_social_identity(fingerprint)
            .map(|social| social.display_name().to_string())
    }

    /// Time of the last completed handshake with a fingerprint
    pub async fn get_last_interaction(&self, fingerprint: &Fingerprint) -> Option<Timestamp> {
        self.state
            .read()
            .await
            .cache
            .last_interactions()
            .get(fingerprint)
            .copied()
    }

    // ------------------------------------------------------------------------
    // Maintenance
    // ------------------------------------------------------------------------

    /// Wipe all identity data, in memory and in storage
    ///
    /// Irreversible. Channel passwords are owned by the channel layer and are
    /// left alone.
    pub async fn clear_all_identity_data(&self) -> Result<()> {
        let mut state = self.state.write().await;
        *state = IdentityState::default();

        self.storage
            .delete(&identity_key(&self.config.cache_blob_name))?;
        self.storage
            .delete(&identity_key(&self.config.encryption_key_name))?;

        security_event!(warn, "All identity data cleared");
        Ok(())
    }

    /// Get identity cache statistics
    pub async fn cache_stats(&self) -> IdentityCacheStats {
        self.state.read().await.cache.stats()
    }

    /// Copy of the current cache
    pub async fn cache_snapshot(&self) -> IdentityCache {
        self.state.read().await.cache.clone()
    }

    /// Check if storage is available
    pub fn is_storage_available(&self) -> bool {
        self.storage.is_available()
    }

    // ------------------------------------------------------------------------
    // Private Methods
    // ------------------------------------------------------------------------

    async fn modify_social<F>(&self, fingerprint: &Fingerprint, update: F) -> Result<()>
    where
        F: FnOnce(&mut SocialIdentity),
    {
        let mut state = self.state.write().await;
        state.cache.update_social_identity_with(fingerprint, update);
        self.persist(&mut state)
    }

    /// Encrypt and store the whole cache
    fn persist(&self, state: &mut IdentityState) -> Result<()> {
        let key = match state.cache_key.take() {
            Some(key) => key,
            None => self.create_key()?,
        };
        let result = self.seal_and_store(&state.cache, &key);
        state.cache_key = Some(key);

        if let Err(err) = &result {
            warn!(error = %err, "Failed to persist identity cache");
        }
        result
    }

    fn seal_and_store(&self, cache: &IdentityCache, key: &CacheKey) -> Result<()> {
        let encoded = Zeroizing::new(bincode::serialize(cache)?);
        let sealed = self.crypto.aes_gcm_encrypt(&encoded, key.as_slice())?;
        self.storage
            .store(&identity_key(&self.config.cache_blob_name), &sealed)
    }

    fn load_or_create_key(&self) -> Option<CacheKey> {
        let key_name = identity_key(&self.config.encryption_key_name);
        match self.storage.retrieve(&key_name) {
            Ok(Some(bytes)) => {
                let bytes = Zeroizing::new(bytes);
                if let Some(key) = key_from_slice(&bytes) {
                    return Some(key);
                }
                security_event!(warn, length = bytes.len(), "Stored cache key is malformed, replacing it");
            }
            Ok(None) => {}
            Err(err) => {
                warn!(error = %err, "Cache key unreadable, will retry on next write");
                return None;
            }
        }

        match self.create_key() {
            Ok(key) => Some(key),
            Err(err) => {
                warn!(error = %err, "Could not create cache key, will retry on next write");
                None
            }
        }
    }

    /// Generate a fresh cache key and store it
    fn create_key(&self) -> Result<CacheKey> {
        let bytes = Zeroizing::new(self.crypto.random_bytes(SYMMETRIC_KEY_LEN)?);
        let key = key_from_slice(&bytes).ok_or(CryptographicError::InvalidKeyFormat {
            expected: SYMMETRIC_KEY_LEN,
            actual: bytes.len(),
        })?;
        self.storage
            .store(&identity_key(&self.config.encryption_key_name), key.as_slice())?;
        debug!("Generated new identity cache key");
        Ok(key)
    }

    fn load_cache(&self, key: Option<&CacheKey>) -> IdentityCache {
        let blob = match self.storage.retrieve(&identity_key(&self.config.cache_blob_name)) {
            Ok(Some(blob)) => blob,
            Ok(None) => return IdentityCache::new(),
            Err(err) => {
                warn!(error = %err, "Identity cache unreadable, starting empty");
                return IdentityCache::new();
            }
        };

        let Some(key) = key else {
            warn!("No key for stored identity cache, starting empty");
            return IdentityCache::new();
        };

        let decrypted = match self.crypto.aes_gcm_decrypt(&blob, key.as_slice()) {
            Ok(plaintext) => Zeroizing::new(plaintext),
            Err(err) => {
                security_event!(warn, error = %err, "Identity cache failed authentication, starting empty");
                return IdentityCache::new();
            }
        };

        match bincode::deserialize::<IdentityCache>(&decrypted) {
            Ok(mut cache) => {
                cache.rebuild_nickname_index();
                cache
            }
            Err(err) => {
                warn!(error = %err, "Identity cache could not be decoded, starting empty");
                IdentityCache::new()
            }
        }
    }
}

fn key_from_slice(bytes: &[u8]) -> Option<CacheKey> {
    <[u8; SYMMETRIC_KEY_LEN]>::try_from(bytes).ok().map(Zeroizing::new)
}
