//! Shared key-value byte store for Shelfmark.
//!
//! A flat namespace of string keys mapping to small byte payloads, backed
//! by one file per key in a shared directory. The directory is shared with
//! the share-extension process, so individual writes go through a
//! temp-file-and-rename sequence: a reader either sees the old bytes or
//! the new bytes, never a partial write.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Errors that can occur when accessing the shared store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unable to resolve shared storage directory")]
    NoStorageDirectory,
    #[error("invalid store key: {0:?}")]
    InvalidKey(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Durable key-value byte store backed by a shared directory.
///
/// Keys are restricted to a filename-safe character set (`A-Z a-z 0-9`
/// plus `_`, `-`, `.` and `=`) and may not start with a dot; each key maps
/// to one file directly under the store root.
///
/// # Example
///
/// ```no_run
/// use shelfmark_store::SharedStore;
///
/// let store = SharedStore::from_default_location().unwrap();
/// store.set("greeting", b"hello").unwrap();
/// assert_eq!(store.get("greeting").unwrap(), Some(b"hello".to_vec()));
/// ```
#[derive(Debug, Clone)]
pub struct SharedStore {
    root: PathBuf,
}

impl SharedStore {
    /// Open the store at the platform's shared cache location,
    /// creating the directory if needed.
    pub fn from_default_location() -> Result<Self, StoreError> {
        let base = dirs::cache_dir().ok_or(StoreError::NoStorageDirectory)?;
        Self::with_root(base.join("shelfmark").join("shared"))
    }

    /// Open the store at an explicit root directory, creating it if needed.
    pub fn with_root(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read the bytes stored under `key`. Returns `None` if the key is absent.
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write `bytes` under `key`, replacing any previous value.
    ///
    /// The write lands in a temp file first and is renamed into place, so
    /// concurrent readers never observe a torn entry.
    pub fn set(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let tmp = self.root.join(format!(".{key}.tmp"));
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Delete the entry under `key`. Missing keys are not an error.
    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Check whether an entry exists under `key`.
    pub fn contains(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.path_for(key)?.exists())
    }

    /// List all keys starting with `prefix`.
    ///
    /// In-flight temp files are excluded from the listing.
    pub fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with('.') {
                continue;
            }
            if name.starts_with(prefix) {
                keys.push(name.to_string());
            }
        }
        Ok(keys)
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        if key.is_empty()
            || key.starts_with('.')
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '='))
        {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, SharedStore) {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = SharedStore::with_root(temp.path()).expect("store should open");
        (temp, store)
    }

    #[test]
    fn round_trip() {
        let (_temp, store) = store();
        store.set("alpha", b"payload").unwrap();
        assert_eq!(store.get("alpha").unwrap(), Some(b"payload".to_vec()));
    }

    #[test]
    fn missing_key_is_none() {
        let (_temp, store) = store();
        assert_eq!(store.get("absent").unwrap(), None);
        assert!(!store.contains("absent").unwrap());
    }

    #[test]
    fn overwrite_replaces_value() {
        let (_temp, store) = store();
        store.set("alpha", b"one").unwrap();
        store.set("alpha", b"two").unwrap();
        assert_eq!(store.get("alpha").unwrap(), Some(b"two".to_vec()));
    }

    #[test]
    fn remove_is_idempotent() {
        let (_temp, store) = store();
        store.set("alpha", b"one").unwrap();
        store.remove("alpha").unwrap();
        assert_eq!(store.get("alpha").unwrap(), None);
        store.remove("alpha").unwrap();
    }

    #[test]
    fn prefix_scan_lists_only_matching_keys() {
        let (_temp, store) = store();
        store.set("preview_a", b"1").unwrap();
        store.set("preview_b", b"2").unwrap();
        store.set("other_c", b"3").unwrap();

        let mut keys = store.keys_with_prefix("preview_").unwrap();
        keys.sort();
        assert_eq!(keys, vec!["preview_a".to_string(), "preview_b".to_string()]);
    }

    #[test]
    fn rejects_unsafe_keys() {
        let (_temp, store) = store();
        assert!(matches!(store.set("", b"x"), Err(StoreError::InvalidKey(_))));
        assert!(matches!(
            store.set("../escape", b"x"),
            Err(StoreError::InvalidKey(_))
        ));
        assert!(matches!(
            store.get(".hidden"),
            Err(StoreError::InvalidKey(_))
        ));
    }
}
