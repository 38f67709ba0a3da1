//! Social identity with user-assigned metadata

use serde::{Deserialize, Serialize};

use super::types::TrustLevel;
use crate::types::Fingerprint;

/// Nickname given to identities created before the peer announced one
pub const PLACEHOLDER_NICKNAME: &str = "Unknown";

/// Durable, user-facing record for a fingerprint
///
/// A social identity is never both favorite and blocked; the setters enforce
/// this and [`SocialIdentity::normalize`] repairs records built by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialIdentity {
    /// Associated fingerprint
    pub fingerprint: Fingerprint,
    /// User-assigned local petname
    pub local_petname: Option<String>,
    /// Nickname the peer announced
    pub claimed_nickname: String,
    /// Trust level
    pub trust_level: TrustLevel,
    pub is_favorite: bool,
    pub is_blocked: bool,
    /// Free-form notes
    pub notes: Option<String>,
}

impl SocialIdentity {
    /// Create a placeholder identity for a fingerprint
    pub fn new(fingerprint: Fingerprint) -> Self {
        Self::with_nickname(fingerprint, PLACEHOLDER_NICKNAME)
    }

    /// Create an identity with a claimed nickname
    pub fn with_nickname(fingerprint: Fingerprint, claimed_nickname: impl Into<String>) -> Self {
        Self {
            fingerprint,
            local_petname: None,
            claimed_nickname: claimed_nickname.into(),
            trust_level: TrustLevel::Unknown,
            is_favorite: false,
            is_blocked: false,
            notes: None,
        }
    }

    /// Petname if set, otherwise the claimed nickname
    pub fn display_name(&self) -> &str {
        self.local_petname
            .as_deref()
            .unwrap_or(self.claimed_nickname.as_str())
    }

    /// Set local petname
    pub fn set_petname(&mut self, petname: Option<String>) {
        self.local_petname = petname;
    }

    /// Mark or unmark as favorite; favoriting lifts a block
    pub fn set_favorite(&mut self, favorite: bool) {
        self.is_favorite = favorite;
        if favorite {
            self.is_blocked = false;
        }
    }

    /// Block or unblock; blocking drops favorite
    pub fn set_blocked(&mut self, blocked: bool) {
        self.is_blocked = blocked;
        if blocked {
            self.is_favorite = false;
        }
    }

    /// Restore the favorite/blocked exclusion, blocked wins
    pub fn normalize(&mut self) {
        if self.is_blocked {
            self.is_favorite = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_favorite_and_blocked_are_exclusive() {
        let mut social = SocialIdentity::new(Fingerprint::new([1u8; 32]));
        assert_eq!(social.claimed_nickname, PLACEHOLDER_NICKNAME);

        social.set_favorite(true);
        social.set_blocked(true);
        assert!(social.is_blocked && !social.is_favorite);

        social.set_favorite(true);
        assert!(social.is_favorite && !social.is_blocked);

        social.is_blocked = true;
        social.normalize();
        assert!(!social.is_favorite);
    }

    #[test]
    fn test_display_name_prefers_petname() {
        let mut social = SocialIdentity::with_nickname(Fingerprint::new([2u8; 32]), "alice");
        assert_eq!(social.display_name(), "alice");
        social.set_petname(Some("Alice (work)".to_string()));
        assert_eq!(social.display_name(), "Alice (work)");
    }
}
