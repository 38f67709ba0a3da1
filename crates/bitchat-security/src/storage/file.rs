//! File-backed credential storage
//!
//! One file per key inside a service directory. File names are the hex
//! encoding of the key so arbitrary channel names stay filesystem safe.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::SecureStorage;
use crate::{BitchatError, Result, StorageError};

const TEMP_PREFIX: &str = ".tmp-";

/// File-backed [`SecureStorage`]
#[derive(Debug, Clone)]
pub struct FileSecureStorage {
    root: PathBuf,
}

impl FileSecureStorage {
    /// Open (creating if needed) a store rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(io_error)?;
        restrict_permissions(&root, 0o700)?;
        debug!("Opened credential store at {}", root.display());
        Ok(Self { root })
    }

    /// Directory holding the entries
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(hex::encode(key.as_bytes()))
    }
}

impl SecureStorage for FileSecureStorage {
    fn store(&self, key: &str, data: &[u8]) -> Result<()> {
        let file_name = hex::encode(key.as_bytes());
        let temp_path = self.root.join(format!("{TEMP_PREFIX}{file_name}"));

        {
            let mut file = fs::File::create(&temp_path).map_err(io_error)?;
            restrict_permissions(&temp_path, 0o600)?;
            file.write_all(data).map_err(io_error)?;
            file.sync_all().map_err(io_error)?;
        }

        fs::rename(&temp_path, self.entry_path(key)).map_err(io_error)
    }

    fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.entry_path(key)) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(err)),
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error(err)),
        }
    }

    fn list_keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(io_error)? {
            let entry = entry.map_err(io_error)?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with(TEMP_PREFIX) {
                continue;
            }
            let Ok(bytes) = hex::decode(name) else { continue };
            if let Ok(key) = String::from_utf8(bytes) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn clear_all(&self) -> Result<()> {
        for key in self.list_keys()? {
            self.delete(&key)?;
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.root.is_dir()
    }
}

fn io_error(err: io::Error) -> BitchatError {
    match err.kind() {
        io::ErrorKind::PermissionDenied => BitchatError::Storage(StorageError::AccessDenied),
        _ => BitchatError::Storage(StorageError::Io(err.to_string())),
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(io_error)
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSecureStorage::open(dir.path().join("chat.bitchat")).unwrap();
        assert!(storage.is_available());

        storage.store("channel_#general", b"hunter2").unwrap();
        storage.store("identity_key", &[0u8, 1, 2]).unwrap();
        assert_eq!(
            storage.retrieve("channel_#general").unwrap(),
            Some(b"hunter2".to_vec())
        );
        assert_eq!(
            storage.list_keys().unwrap(),
            vec!["channel_#general".to_string(), "identity_key".to_string()]
        );

        storage.store("identity_key", &[9]).unwrap();
        assert_eq!(storage.retrieve("identity_key").unwrap(), Some(vec![9]));

        storage.delete("channel_#general").unwrap();
        storage.delete("channel_#general").unwrap();
        assert!(storage.retrieve("channel_#general").unwrap().is_none());

        storage.clear_all().unwrap();
        assert!(storage.list_keys().unwrap().is_empty());
    }

    #[test]
    fn test_file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svc");
        FileSecureStorage::open(&path)
            .unwrap()
            .store("identity_blob", b"abc")
            .unwrap();

        let reopened = FileSecureStorage::open(&path).unwrap();
        assert_eq!(reopened.retrieve("identity_blob").unwrap(), Some(b"abc".to_vec()));
    }

    #[cfg(unix)]
    #[test]
    fn test_entries_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let storage = FileSecureStorage::open(dir.path().join("svc")).unwrap();
        storage.store("identity_key", &[1]).unwrap();

        let mode = fs::metadata(storage.entry_path("identity_key"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
