//! In-memory storage for tests and fallback

use core::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;

use super::SecureStorage;
use crate::{BitchatError, Result, StorageError};

/// In-memory [`SecureStorage`]
///
/// Availability can be toggled to exercise storage failure paths.
#[derive(Debug)]
pub struct MemoryStorage {
    data: DashMap<String, Vec<u8>>,
    available: AtomicBool,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate the backing store becoming unavailable (or available again)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn ensure_available(&self) -> Result<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(BitchatError::Storage(StorageError::NotAvailable))
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl SecureStorage for MemoryStorage {
    fn store(&self, key: &str, data: &[u8]) -> Result<()> {
        self.ensure_available()?;
        self.data.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.ensure_available()?;
        Ok(self.data.get(key).map(|entry| entry.value().clone()))
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.ensure_available()?;
        self.data.remove(key);
        Ok(())
    }

    fn list_keys(&self) -> Result<Vec<String>> {
        self.ensure_available()?;
        let mut keys: Vec<String> = self.data.iter().map(|entry| entry.key().clone()).collect();
        keys.sort();
        Ok(keys)
    }

    fn clear_all(&self) -> Result<()> {
        self.ensure_available()?;
        self.data.clear();
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}
