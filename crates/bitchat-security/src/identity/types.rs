//! Core identity types and enums

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::Fingerprint;

// ----------------------------------------------------------------------------
// Handshake State
// ----------------------------------------------------------------------------

/// Handshake state for a transport connection
///
/// Only the terminal states reported by the handshake layer are tracked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandshakeState {
    /// No completed handshake yet
    #[default]
    None,
    /// Handshake completed and authenticated this fingerprint
    Completed { fingerprint: Fingerprint },
}

impl HandshakeState {
    /// Check if handshake is complete
    pub fn is_complete(&self) -> bool {
        matches!(self, HandshakeState::Completed { .. })
    }

    /// Get the fingerprint if handshake is complete
    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        match self {
            HandshakeState::Completed { fingerprint } => Some(fingerprint),
            HandshakeState::None => None,
        }
    }
}

// ----------------------------------------------------------------------------
// Trust Level
// ----------------------------------------------------------------------------

/// Trust level for a peer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TrustLevel {
    /// Never interacted with deliberately (default)
    #[default]
    Unknown = 0,
    /// Known peer, fingerprint not verified
    Casual = 1,
    /// Fingerprint confirmed out-of-band
    Verified = 2,
}

// ----------------------------------------------------------------------------
// Identity Hint
// ----------------------------------------------------------------------------

/// Nickname-based guess at who a transport peer is
///
/// A hint is never authentication; only a completed handshake correlates a
/// transport peer with a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityHint {
    /// No cached identity claims this nickname
    Unknown,
    /// Exactly one cached identity claims this nickname
    LikelyKnown(Fingerprint),
    /// Several cached identities claim this nickname
    Ambiguous(BTreeSet<Fingerprint>),
}

impl IdentityHint {
    /// Build a hint from the fingerprints indexed under a nickname
    pub fn from_candidates(candidates: Option<&BTreeSet<Fingerprint>>) -> Self {
        match candidates {
            None => IdentityHint::Unknown,
            Some(set) => {
                let mut iter = set.iter();
                match (iter.next(), iter.next()) {
                    (None, _) => IdentityHint::Unknown,
                    (Some(only), None) => IdentityHint::LikelyKnown(only.clone()),
                    _ => IdentityHint::Ambiguous(set.clone()),
                }
            }
        }
    }

    /// Short label for logging
    pub fn kind(&self) -> &'static str {
        match self {
            IdentityHint::Unknown => "unknown",
            IdentityHint::LikelyKnown(_) => "likely-known",
            IdentityHint::Ambiguous(_) => "ambiguous",
        }
    }
}

// ----------------------------------------------------------------------------
// Pending Actions
// ----------------------------------------------------------------------------

/// User intent recorded before a transport peer's fingerprint is known
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingActions {
    pub toggle_favorite: Option<bool>,
    pub set_trust_level: Option<TrustLevel>,
    pub set_petname: Option<String>,
}

impl PendingActions {
    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        self.toggle_favorite.is_none() && self.set_trust_level.is_none() && self.set_petname.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_from_candidates() {
        assert_eq!(IdentityHint::from_candidates(None), IdentityHint::Unknown);
        assert_eq!(
            IdentityHint::from_candidates(Some(&BTreeSet::new())),
            IdentityHint::Unknown
        );

        let a = Fingerprint::new([1u8; 32]);
        let b = Fingerprint::new([2u8; 32]);
        let single: BTreeSet<_> = [a.clone()].into_iter().collect();
        assert_eq!(
            IdentityHint::from_candidates(Some(&single)),
            IdentityHint::LikelyKnown(a.clone())
        );

        let both: BTreeSet<_> = [a, b].into_iter().collect();
        assert_eq!(
            IdentityHint::from_candidates(Some(&both)),
            IdentityHint::Ambiguous(both.clone())
        );
    }

    #[test]
    fn test_handshake_state_accessors() {
        let fingerprint = Fingerprint::new([7u8; 32]);
        assert!(!HandshakeState::None.is_complete());
        let done = HandshakeState::Completed {
            fingerprint: fingerprint.clone(),
        };
        assert!(done.is_complete());
        assert_eq!(done.fingerprint(), Some(&fingerprint));
    }
}
