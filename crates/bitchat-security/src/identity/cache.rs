//! Identity cache: the single persisted aggregate of durable trust state
//!
//! Every fingerprint listed under `nickname_index[n]` has a social identity
//! whose claimed nickname is `n`, and no bucket is ever empty. All writes go
//! through methods that keep that index in step with `social_identities`.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{SocialIdentity, TrustLevel};
use crate::types::{Fingerprint, Timestamp};

/// Durable identity state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityCache {
    social_identities: BTreeMap<Fingerprint, SocialIdentity>,
    nickname_index: BTreeMap<String, BTreeSet<Fingerprint>>,
    last_interactions: BTreeMap<Fingerprint, Timestamp>,
    verified_fingerprints: BTreeSet<Fingerprint>,
}

impl IdentityCache {
    /// Create a new empty identity cache
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Social identities by fingerprint
    pub fn social_identities(&self) -> &BTreeMap<Fingerprint, SocialIdentity> {
        &self.social_identities
    }

    /// Fingerprints grouped by claimed nickname
    pub fn nickname_index(&self) -> &BTreeMap<String, BTreeSet<Fingerprint>> {
        &self.nickname_index
    }

    /// Last completed handshake per fingerprint
    pub fn last_interactions(&self) -> &BTreeMap<Fingerprint, Timestamp> {
        &self.last_interactions
    }

    /// Fingerprints verified out-of-band
    pub fn verified_fingerprints(&self) -> &BTreeSet<Fingerprint> {
        &self.verified_fingerprints
    }

    /// Get social identity by fingerprint
    pub fn get_social_identity(&self, fingerprint: &Fingerprint) -> Option<&SocialIdentity> {
        self.social_identities.get(fingerprint)
    }

    /// Fingerprints whose identity claims `nickname`
    pub fn candidates_for_nickname(&self, nickname: &str) -> Option<&BTreeSet<Fingerprint>> {
        self.nickname_index.get(nickname)
    }

    /// Check if a fingerprint is verified
    pub fn is_verified(&self, fingerprint: &Fingerprint) -> bool {
        self.verified_fingerprints.contains(fingerprint)
    }

    /// Fingerprints marked favorite
    pub fn favorites(&self) -> BTreeSet<Fingerprint> {
        self.social_identities
            .values()
            .filter(|social| social.is_favorite)
            .map(|social| social.fingerprint.clone())
            .collect()
    }

    // ------------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------------

    /// Insert or replace a social identity, re-indexing its nickname
    pub fn upsert_social_identity(&mut self, mut identity: SocialIdentity) {
        identity.normalize();

        let fingerprint = identity.fingerprint.clone();
        if let Some(existing) = self.social_identities.get(&fingerprint) {
            if existing.claimed_nickname != identity.claimed_nickname {
                let old_nickname = existing.claimed_nickname.clone();
                self.unindex(&old_nickname, &fingerprint);
            }
        }

        self.nickname_index
            .entry(identity.claimed_nickname.clone())
            .or_default()
            .insert(fingerprint.clone());
        self.social_identities.insert(fingerprint, identity);
    }

    /// Fetch-or-create the identity for `fingerprint`, apply `update`, and store it
    pub fn update_social_identity_with<F>(&mut self, fingerprint: &Fingerprint, update: F)
    where
        F: FnOnce(&mut SocialIdentity),
    {
        let mut identity = self
            .social_identities
            .get(fingerprint)
            .cloned()
            .unwrap_or_else(|| SocialIdentity::new(fingerprint.clone()));
        update(&mut identity);
        self.upsert_social_identity(identity);
    }

    /// Forget a peer: identity, index entry, last interaction and verification
    pub fn remove_social_identity(&mut self, fingerprint: &Fingerprint) -> Option<SocialIdentity> {
        let removed = self.social_identities.remove(fingerprint);
        if let Some(identity) = &removed {
            self.unindex(&identity.claimed_nickname, fingerprint);
        }
        self.last_interactions.remove(fingerprint);
        self.verified_fingerprints.remove(fingerprint);
        removed
    }

    /// Set verified status, mirroring it into the trust level of an existing identity
    pub fn set_verified(&mut self, fingerprint: &Fingerprint, verified: bool) {
        if verified {
            self.verified_fingerprints.insert(fingerprint.clone());
        } else {
            self.verified_fingerprints.remove(fingerprint);
        }

        if let Some(identity) = self.social_identities.get_mut(fingerprint) {
            identity.trust_level = if verified {
                TrustLevel::Verified
            } else {
                TrustLevel::Casual
            };
        }
    }

    /// Set the trust level of a (fetched-or-created) identity
    ///
    /// `Verified` is only reachable through verification, so it also enters the
    /// verified set; any other level leaves it.
    pub fn set_trust_level(&mut self, fingerprint: &Fingerprint, level: TrustLevel) {
        self.update_social_identity_with(fingerprint, |identity| identity.trust_level = level);
        if level == TrustLevel::Verified {
            self.verified_fingerprints.insert(fingerprint.clone());
        } else {
            self.verified_fingerprints.remove(fingerprint);
        }
    }

    /// Record a completed handshake
    pub fn record_interaction(&mut self, fingerprint: Fingerprint, at: Timestamp) {
        self.last_interactions.insert(fingerprint, at);
    }

    /// Rebuild the nickname index from the social identities
    ///
    /// Applied to freshly decoded caches so a stale index can never leak into
    /// identity resolution.
    pub fn rebuild_nickname_index(&mut self) {
        self.nickname_index.clear();
        for identity in self.social_identities.values_mut() {
            identity.normalize();
            self.nickname_index
                .entry(identity.claimed_nickname.clone())
                .or_default()
                .insert(identity.fingerprint.clone());
        }
    }

    /// True when the nickname index exactly mirrors the social identities
    pub fn nickname_index_is_consistent(&self) -> bool {
        let no_empty_buckets = self.nickname_index.values().all(|bucket| !bucket.is_empty());
        let indexed_match = self.nickname_index.iter().all(|(nickname, bucket)| {
            bucket.iter().all(|fingerprint| {
                self.social_identities
                    .get(fingerprint)
                    .is_some_and(|social| &social.claimed_nickname == nickname)
            })
        });
        let all_indexed = self.social_identities.values().all(|social| {
            self.nickname_index
                .get(&social.claimed_nickname)
                .is_some_and(|bucket| bucket.contains(&social.fingerprint))
        });
        no_empty_buckets && indexed_match && all_indexed
    }

    /// Get cache statistics
    pub fn stats(&self) -> IdentityCacheStats {
        IdentityCacheStats {
            total_social_identities: self.social_identities.len(),
            total_nicknames: self.nickname_index.len(),
            total_verified: self.verified_fingerprints.len(),
            total_favorites: self
                .social_identities
                .values()
                .filter(|s| s.is_favorite)
                .count(),
            total_blocked: self
                .social_identities
                .values()
                .filter(|s| s.is_blocked)
                .count(),
        }
    }

    fn unindex(&mut self, nickname: &str, fingerprint: &Fingerprint) {
        if let Some(bucket) = self.nickname_index.get_mut(nickname) {
            bucket.remove(fingerprint);
            if bucket.is_empty() {
                self.nickname_index.remove(nickname);
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Statistics
// ----------------------------------------------------------------------------

/// Statistics about the identity cache
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityCacheStats {
    pub total_social_identities: usize,
    /// Distinct claimed nicknames
    pub total_nicknames: usize,
    pub total_verified: usize,
    pub total_favorites: usize,
    pub total_blocked: usize,
}
