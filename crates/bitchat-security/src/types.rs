//! Core types for BitChat identity correlation
//!
//! Newtypes for transport peer identifiers, fingerprints and timestamps, plus the
//! [`TimeSource`] seam that lets tests control the clock.

use core::fmt;
use core::ops::Deref;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::BitchatError;

// ----------------------------------------------------------------------------
// Peer Identifier
// ----------------------------------------------------------------------------

/// Connection-scoped transport peer identifier (8 bytes)
///
/// Assigned by the mesh transport and free to change across reconnects, so it
/// never carries durable trust on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeerId([u8; 8]);

impl PeerId {
    /// Create a new PeerId from 8 bytes
    pub const fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Create PeerId from the first 8 bytes of a longer identifier
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut id = [0u8; 8];
        let len = core::cmp::min(bytes.len(), 8);
        id[..len].copy_from_slice(&bytes[..len]);
        Self(id)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for PeerId {
    type Err = BitchatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let clean_str = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(clean_str)
            .map_err(|_| BitchatError::invalid_input("Invalid hex in PeerId"))?;

        if bytes.len() != 8 {
            return Err(BitchatError::invalid_input("PeerId must be exactly 8 bytes"));
        }

        Ok(Self::from_bytes(&bytes))
    }
}

impl Deref for PeerId {
    type Target = [u8; 8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// ----------------------------------------------------------------------------
// Fingerprint
// ----------------------------------------------------------------------------

/// SHA-256 fingerprint of a peer's static public key
///
/// The unit of durable trust. Produced by the handshake layer once a transport
/// peer has proven possession of its static key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Create a new fingerprint from 32 bytes
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Short hex prefix for log lines
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Fingerprint {
    type Err = BitchatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let clean_str = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(clean_str)
            .map_err(|_| BitchatError::invalid_input("Invalid hex in Fingerprint"))?;

        let fingerprint: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| BitchatError::invalid_input("Fingerprint must be exactly 32 bytes"))?;
        Ok(Self(fingerprint))
    }
}

impl Deref for Fingerprint {
    type Target = [u8; 32];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// ----------------------------------------------------------------------------
// Timestamp
// ----------------------------------------------------------------------------

/// Millisecond timestamp since Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Create a new timestamp
    pub const fn new(millis: u64) -> Self {
        Self(millis)
    }

    /// Current wall-clock time
    pub fn now() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self(duration.as_millis() as u64)
    }

    /// Get the raw milliseconds
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Add seconds to this timestamp
    pub fn add_seconds(&self, seconds: u64) -> Self {
        Self(self.0.saturating_add(seconds.saturating_mul(1000)))
    }

    /// Subtract seconds from this timestamp, saturating at the epoch
    pub fn sub_seconds(&self, seconds: u64) -> Self {
        Self(self.0.saturating_sub(seconds.saturating_mul(1000)))
    }

    /// Duration since an earlier timestamp; zero if `other` is later
    pub fn duration_since(&self, other: Self) -> core::time::Duration {
        core::time::Duration::from_millis(self.0.saturating_sub(other.0))
    }
}

// ----------------------------------------------------------------------------
// Time Source Trait
// ----------------------------------------------------------------------------

/// Source of wall-clock timestamps
///
/// Injected into the identity manager and channel layer so freshness checks
/// can be driven deterministically in tests.
pub trait TimeSource: Send + Sync + fmt::Debug {
    /// Get the current timestamp
    fn now(&self) -> Timestamp;
}

/// System clock implementation of [`TimeSource`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl SystemTimeSource {
    pub fn new() -> Self {
        Self
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_id() {
        let bytes = [1, 2, 3, 4, 5, 6, 7, 8];
        let peer_id = PeerId::new(bytes);
        assert_eq!(peer_id.as_bytes(), &bytes);

        let from_long = PeerId::from_bytes(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(from_long.as_bytes(), &bytes);

        let parsed: PeerId = "0102030405060708".parse().unwrap();
        assert_eq!(parsed, peer_id);
        assert!("0102".parse::<PeerId>().is_err());
    }

    #[test]
    fn test_fingerprint_parse_and_display() {
        let fingerprint = Fingerprint::new([0xab; 32]);
        let text = fingerprint.to_string();
        assert_eq!(text.len(), 64);
        assert_eq!(text.parse::<Fingerprint>().unwrap(), fingerprint);
        assert_eq!(fingerprint.short(), "abababab");
        assert!("abcd".parse::<Fingerprint>().is_err());
        assert!("zz".repeat(32).parse::<Fingerprint>().is_err());
    }

    #[test]
    fn test_timestamp_arithmetic() {
        let ts = Timestamp::new(10_000);
        assert_eq!(ts.add_seconds(5).as_millis(), 15_000);
        assert_eq!(ts.sub_seconds(20).as_millis(), 0);
        assert_eq!(ts.add_seconds(1).duration_since(ts).as_secs(), 1);
        assert_eq!(ts.duration_since(ts.add_seconds(1)).as_millis(), 0);
    }
}
