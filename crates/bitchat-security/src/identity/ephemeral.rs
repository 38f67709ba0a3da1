//! Ephemeral identity for a single transport connection

use super::types::HandshakeState;
use crate::types::{Fingerprint, PeerId, Timestamp};

/// Transient per-connection record, never persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EphemeralIdentity {
    /// Transport peer ID for this connection
    pub peer_id: PeerId,
    /// Connection start time
    pub session_start: Timestamp,
    /// Current handshake state
    pub handshake_state: HandshakeState,
}

impl EphemeralIdentity {
    /// Create a new ephemeral identity
    pub fn new(peer_id: PeerId, session_start: Timestamp, handshake_state: HandshakeState) -> Self {
        Self {
            peer_id,
            session_start,
            handshake_state,
        }
    }

    /// Update handshake state
    pub fn set_handshake_state(&mut self, state: HandshakeState) {
        self.handshake_state = state;
    }

    /// Get fingerprint if handshake is complete
    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        self.handshake_state.fingerprint()
    }
}
