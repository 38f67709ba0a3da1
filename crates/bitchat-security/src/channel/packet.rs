//! Channel key packet and stored password record

use core::fmt;
use core::time::Duration;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::types::{Fingerprint, Timestamp};
use crate::Result;

/// Length of the random replay nonce carried by a key packet
pub const KEY_PACKET_NONCE_LEN: usize = 16;

// ----------------------------------------------------------------------------
// Key Packet
// ----------------------------------------------------------------------------

/// Channel password shared with a peer over an established secure session
///
/// Serialized as JSON; `timestamp` is Unix milliseconds and `nonce` is base64.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelKeyPacket {
    pub channel: String,
    pub password: String,
    pub timestamp: Timestamp,
    pub nonce: String,
}

impl ChannelKeyPacket {
    /// Serialize to the wire format
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize from the wire format
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Packet age at `now`; a timestamp in the future counts as zero
    pub fn age(&self, now: Timestamp) -> Duration {
        now.duration_since(self.timestamp)
    }
}

impl fmt::Debug for ChannelKeyPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelKeyPacket")
            .field("channel", &self.channel)
            .field("password", &"<redacted>")
            .field("timestamp", &self.timestamp)
            .field("nonce", &self.nonce)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Stored Password Record
// ----------------------------------------------------------------------------

/// Version tag written into every stored record
pub(crate) const STORED_RECORD_VERSION: u8 = 1;

/// What the credential store keeps per channel
///
/// The password (never the derived key) plus the creator fingerprint that went
/// into the salt, so the key re-derives identically after a restart.
///
/// Older stores hold the bare password. Only a JSON object with exactly these
/// fields and the current `version` is read as a record; anything else that is
/// valid UTF-8 is the password itself.
#[derive(PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct StoredChannelPassword {
    version: u8,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_fingerprint: Option<String>,
}

impl StoredChannelPassword {
    pub fn new(password: &str, creator: Option<&Fingerprint>) -> Self {
        Self {
            version: STORED_RECORD_VERSION,
            password: password.to_string(),
            creator_fingerprint: creator.map(Fingerprint::to_string),
        }
    }

    pub fn encode(&self) -> Result<Zeroizing<Vec<u8>>> {
        Ok(Zeroizing::new(serde_json::to_vec(self)?))
    }

    /// Decode a record, accepting a bare UTF-8 password from older stores
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        match serde_json::from_slice::<Self>(bytes) {
            Ok(record) if record.version == STORED_RECORD_VERSION => return Some(record),
            _ => {}
        }
        core::str::from_utf8(bytes)
            .ok()
            .map(|legacy| Self::new(legacy, None))
    }

    /// Parsed creator fingerprint; a malformed one is treated as absent
    pub fn creator(&self) -> Option<Fingerprint> {
        self.creator_fingerprint
            .as_deref()
            .and_then(|hex| hex.parse().ok())
    }
}

impl Drop for StoredChannelPassword {
    fn drop(&mut self) {
        zeroize::Zeroize::zeroize(&mut self.password);
    }
}
