//! Key/value storage slots.
//!
//! The cart and the site configuration each live in a single named slot
//! holding a JSON string. [`KeyValueStore`] is the seam between that logic and
//! where the bytes actually go:
//!
//! - [`MemoryStore`] - an in-memory map, used for per-visitor session slots
//!   and tests. Supports an optional byte quota and a disabled mode so the
//!   write-failure paths can be exercised.
//! - [`FileStore`] - a directory with one `<key>.json` file per slot, shared
//!   between the storefront, the admin server and the CLI.
//!
//! Concurrent writers to the same slot are last-write-wins.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

/// Errors raised by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Writing the value would exceed the backend's size limit.
    #[error("storage quota exceeded writing {key} (limit {limit} bytes)")]
    QuotaExceeded {
        /// Slot being written.
        key: String,
        /// Configured limit in bytes.
        limit: usize,
    },

    /// The backend cannot be used at all.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Filesystem failure.
    #[error("storage I/O error on {key}: {source}")]
    Io {
        /// Slot being accessed.
        key: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

/// A synchronous string key/value store.
pub trait KeyValueStore {
    /// Read the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be persisted.
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete the value stored under `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be modified.
    fn remove_item(&mut self, key: &str) -> Result<(), StorageError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &mut T {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(key)
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        (**self).remove_item(key)
    }
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-memory storage with an optional total byte quota.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    items: HashMap<String, String>,
    quota: Option<usize>,
    disabled: bool,
}

impl MemoryStore {
    /// An empty, unlimited store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty store that rejects writes once keys plus values exceed `bytes`.
    #[must_use]
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            quota: Some(bytes),
            ..Self::default()
        }
    }

    /// A store on which every operation fails, like storage blocked by the
    /// browser's privacy settings.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::default()
        }
    }

    /// Seed a slot without quota checks.
    #[must_use]
    pub fn with_item(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.items.insert(key.into(), value.into());
        self
    }

    /// Take the value out of a slot, leaving it empty.
    pub fn take(&mut self, key: &str) -> Option<String> {
        self.items.remove(key)
    }

    fn used_bytes_without(&self, key: &str) -> usize {
        self.items
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }

    fn check_enabled(&self) -> Result<(), StorageError> {
        if self.disabled {
            return Err(StorageError::Unavailable("storage is disabled".to_owned()));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check_enabled()?;
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_enabled()?;
        if let Some(limit) = self.quota {
            let needed = self.used_bytes_without(key) + key.len() + value.len();
            if needed > limit {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_owned(),
                    limit,
                });
            }
        }
        self.items.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        self.check_enabled()?;
        self.items.remove(key);
        Ok(())
    }
}

// =============================================================================
// FileStore
// =============================================================================

/// Directory-backed storage, one `<key>.json` file per slot.
///
/// Each write goes to its own uniquely named temporary file in the same
/// directory, which is then renamed over the target. Readers never observe a
/// half-written value, and concurrent writers never share a temp file.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a storage directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            key: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// The directory holding the slot files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::Unavailable(format!(
                "invalid storage key {key:?}"
            )));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }

    fn io_error(key: &str, source: io::Error) -> StorageError {
        StorageError::Io {
            key: key.to_owned(),
            source,
        }
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error(key, e)),
        }
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let temp =
            tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| Self::io_error(key, e))?;

        let mut file = temp.as_file();
        file.write_all(value.as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(|e| Self::io_error(key, e))?;
        temp.persist(&path)
            .map(drop)
            .map_err(|e| Self::io_error(key, e.error))
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(key, e)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get_item("yfhs_cart").unwrap(), None);

        store.set_item("yfhs_cart", "[]").unwrap();
        assert_eq!(store.get_item("yfhs_cart").unwrap().as_deref(), Some("[]"));

        store.remove_item("yfhs_cart").unwrap();
        assert_eq!(store.get_item("yfhs_cart").unwrap(), None);
    }

    #[test]
    fn test_memory_store_quota() {
        let mut store = MemoryStore::with_quota(16);
        store.set_item("k", "short").unwrap();

        let err = store.set_item("k", &"x".repeat(32)).unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { limit: 16, .. }));
        // Failed write leaves the previous value intact.
        assert_eq!(store.get_item("k").unwrap().as_deref(), Some("short"));
    }

    #[test]
    fn test_memory_store_quota_counts_replaced_value_once() {
        let mut store = MemoryStore::with_quota(10);
        store.set_item("k", "123456789").unwrap();
        store.set_item("k", "987654321").unwrap();
    }

    #[test]
    fn test_disabled_store_fails_everything() {
        let mut store = MemoryStore::disabled();
        assert!(matches!(
            store.get_item("k"),
            Err(StorageError::Unavailable(_))
        ));
        assert!(store.set_item("k", "v").is_err());
        assert!(store.remove_item("k").is_err());
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path().join("site")).unwrap();

        assert_eq!(store.get_item("yellowfarmhouse_config").unwrap(), None);
        store
            .set_item("yellowfarmhouse_config", r#"{"ordersPaused":true}"#)
            .unwrap();
        assert!(dir.path().join("site/yellowfarmhouse_config.json").exists());

        let reopened = FileStore::open(dir.path().join("site")).unwrap();
        assert_eq!(
            reopened.get_item("yellowfarmhouse_config").unwrap().as_deref(),
            Some(r#"{"ordersPaused":true}"#)
        );

        store.remove_item("yellowfarmhouse_config").unwrap();
        store.remove_item("yellowfarmhouse_config").unwrap();
        assert_eq!(store.get_item("yellowfarmhouse_config").unwrap(), None);
    }

    #[test]
    fn test_file_store_concurrent_writers_leave_one_whole_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let values: Vec<String> = (0..8)
            .map(|i| format!("[{}]", i.to_string().repeat(4096)))
            .collect();

        std::thread::scope(|scope| {
            for value in &values {
                let mut store = store.clone();
                scope.spawn(move || {
                    for _ in 0..20 {
                        store.set_item("yfhs_cart", value).unwrap();
                    }
                });
            }
        });

        let stored = store.get_item("yfhs_cart").unwrap().unwrap();
        assert!(values.contains(&stored));
        let files: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(files, vec![std::ffi::OsString::from("yfhs_cart.json")]);
    }

    #[test]
    fn test_file_store_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.set_item("../escape", "x"),
            Err(StorageError::Unavailable(_))
        ));
        assert!(store.get_item("").is_err());
    }
}
