//! Key-packet nonces accepted by earlier invocations
//!
//! Every CLI run is a new process, so the channel layer's in-memory replay set
//! starts empty each time. Accepted nonces are kept in the credential store
//! until their packets are old enough to be rejected as stale anyway.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use bitchat_security::{ChannelKeyPacket, SecureStorage, Timestamp};

use crate::error::Result;

const NONCE_PREFIX: &str = "keypacket_nonce_";

/// Persistent record of accepted key-packet nonces
#[derive(Debug, Clone)]
pub struct ReplayLedger {
    storage: Arc<dyn SecureStorage>,
    max_age: Duration,
}

impl ReplayLedger {
    pub fn new(storage: Arc<dyn SecureStorage>, max_age: Duration) -> Self {
        Self { storage, max_age }
    }

    /// Whether a packet with this nonce was already accepted
    pub fn contains(&self, nonce: &str) -> Result<bool> {
        Ok(self.storage.retrieve(&entry_key(nonce))?.is_some())
    }

    /// Remember an accepted packet until it goes stale
    pub fn record(&self, packet: &ChannelKeyPacket) -> Result<()> {
        self.storage.store(
            &entry_key(&packet.nonce),
            &packet.timestamp.as_millis().to_be_bytes(),
        )?;
        Ok(())
    }

    /// Forget nonces whose packets can no longer pass the staleness check
    pub fn prune(&self, now: Timestamp) -> Result<usize> {
        let mut removed = 0;
        for key in self.storage.list_keys()? {
            if !key.starts_with(NONCE_PREFIX) {
                continue;
            }
            let sent = self
                .storage
                .retrieve(&key)?
                .and_then(|bytes| <[u8; 8]>::try_from(bytes.as_slice()).ok())
                .map(|raw| Timestamp::new(u64::from_be_bytes(raw)));
            let expired = match sent {
                Some(sent) => now.duration_since(sent) >= self.max_age,
                None => true,
            };
            if expired {
                self.storage.delete(&key)?;
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, "Pruned expired key-packet nonces");
        }
        Ok(removed)
    }
}

fn entry_key(nonce: &str) -> String {
    format!("{NONCE_PREFIX}{nonce}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitchat_security::MemoryStorage;

    fn packet(nonce: &str, timestamp: Timestamp) -> ChannelKeyPacket {
        ChannelKeyPacket {
            channel: "#c".to_string(),
            password: "pw".to_string(),
            timestamp,
            nonce: nonce.to_string(),
        }
    }

    #[test]
    fn test_ledger_remembers_until_stale() {
        let storage = Arc::new(MemoryStorage::new());
        let ledger = ReplayLedger::new(storage.clone(), Duration::from_secs(300));
        let now = Timestamp::new(1_700_000_000_000);

        ledger.record(&packet("fresh", now.sub_seconds(10))).unwrap();
        ledger.record(&packet("old", now.sub_seconds(300))).unwrap();
        storage.store(&entry_key("garbled"), b"x").unwrap();

        assert_eq!(ledger.prune(now).unwrap(), 2);
        assert!(ledger.contains("fresh").unwrap());
        assert!(!ledger.contains("old").unwrap());
        assert!(!ledger.contains("garbled").unwrap());
    }

    #[test]
    fn test_ledger_entries_are_not_channels() {
        let storage = Arc::new(MemoryStorage::new());
        let ledger = ReplayLedger::new(storage.clone(), Duration::from_secs(300));
        ledger.record(&packet("n", Timestamp::new(0))).unwrap();

        let keys = storage.list_keys().unwrap();
        assert_eq!(keys.len(), 1);
        assert!(bitchat_security::storage::channel_from_key(&keys[0]).is_none());
    }
}
