//! Secure credential storage
//!
//! Opaque key-value storage for the cache encryption key, the encrypted
//! identity cache blob and per-channel passwords. Platform keychains plug in
//! behind [`SecureStorage`]; this crate ships an in-memory store for tests and a
//! file-backed store for desktop targets.

use core::fmt;
use std::sync::Arc;

use crate::Result;

mod file;
mod memory;

pub use file::FileSecureStorage;
pub use memory::MemoryStorage;

/// Default service namespace for credential entries
pub const DEFAULT_SERVICE_ID: &str = "chat.bitchat";

const IDENTITY_PREFIX: &str = "identity_";
const CHANNEL_PREFIX: &str = "channel_";

// ----------------------------------------------------------------------------
// Storage Trait
// ----------------------------------------------------------------------------

/// Key-value credential store
///
/// Implementations synchronize internally; every method takes `&self` so one
/// store can be shared between the identity manager and the channel layer.
pub trait SecureStorage: Send + Sync + fmt::Debug {
    /// Store data under a key, replacing any previous value
    fn store(&self, key: &str, data: &[u8]) -> Result<()>;

    /// Retrieve data by key
    fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete data by key; deleting a missing key succeeds
    fn delete(&self, key: &str) -> Result<()>;

    /// List all keys
    fn list_keys(&self) -> Result<Vec<String>>;

    /// Clear all stored data (panic mode)
    fn clear_all(&self) -> Result<()>;

    /// Check if storage is available and accessible
    fn is_available(&self) -> bool;
}

// ----------------------------------------------------------------------------
// Key Naming
// ----------------------------------------------------------------------------

/// Storage key for identity material (`identity_<name>`)
pub fn identity_key(name: &str) -> String {
    format!("{IDENTITY_PREFIX}{name}")
}

/// Storage key for a channel password (`channel_<channel>`)
pub fn channel_key(channel: &str) -> String {
    format!("{CHANNEL_PREFIX}{channel}")
}

/// Channel name for a storage key produced by [`channel_key`]
pub fn channel_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(CHANNEL_PREFIX)
}

// ----------------------------------------------------------------------------
// Factory Functions
// ----------------------------------------------------------------------------

/// Create a storage implementation for testing
pub fn create_test_storage() -> Arc<MemoryStorage> {
    Arc::new(MemoryStorage::new())
}

/// Create a file-backed store rooted at `base_dir/<service_id>`
pub fn create_file_storage(
    base_dir: impl AsRef<std::path::Path>,
    service_id: &str,
) -> Result<Arc<FileSecureStorage>> {
    Ok(Arc::new(FileSecureStorage::open(
        base_dir.as_ref().join(service_id),
    )?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_naming() {
        assert_eq!(identity_key("cache"), "identity_cache");
        assert_eq!(channel_key("#general"), "channel_#general");
        assert_eq!(channel_from_key("channel_#general"), Some("#general"));
        assert_eq!(channel_from_key("identity_cache"), None);
    }
}
