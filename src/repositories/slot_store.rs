use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::models::{RepositoryError, RepositoryResult};

/// Trait defining the string-keyed blob storage behind the cart and session slots
///
/// Every write is a full overwrite; there is no partial patching.
pub trait SlotStore: Send + Sync {
    /// Read a slot, `None` if it has never been written or was deleted
    fn read(&self, key: &str) -> RepositoryResult<Option<String>>;

    /// Overwrite a slot
    fn write(&self, key: &str, value: &str) -> RepositoryResult<()>;

    /// Remove a slot; removing an absent slot succeeds
    fn delete(&self, key: &str) -> RepositoryResult<()>;
}

/// Volatile slot store
#[derive(Debug, Default)]
pub struct MemorySlotStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with existing slot contents
    pub fn with_slots<I, K, V>(slots: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            slots: Mutex::new(
                slots
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.slots
            .lock()
            .map(|slots| slots.contains_key(key))
            .unwrap_or(false)
    }
}

impl SlotStore for MemorySlotStore {
    fn read(&self, key: &str) -> RepositoryResult<Option<String>> {
        let slots = self.slots.lock().map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(slots.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let mut slots = self.slots.lock().map_err(|_| RepositoryError::LockPoisoned)?;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> RepositoryResult<()> {
        let mut slots = self.slots.lock().map_err(|_| RepositoryError::LockPoisoned)?;
        slots.remove(key);
        Ok(())
    }
}

/// File-backed slot store: one file per key inside a directory
///
/// Writes land in a temporary sibling and are renamed over the slot file, so
/// a reader never sees a half-written slot.
#[derive(Debug, Clone)]
pub struct FileSlotStore {
    dir: PathBuf,
}

impl FileSlotStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> RepositoryResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| RepositoryError::Io {
            key: dir.display().to_string(),
            source,
        })?;
        info!(dir = %dir.display(), "Opened file slot store");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, key: &str) -> RepositoryResult<PathBuf> {
        let valid = !key.is_empty()
            && key != "."
            && key != ".."
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');
        if !valid {
            return Err(RepositoryError::InvalidKey {
                key: key.to_string(),
            });
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl SlotStore for FileSlotStore {
    #[instrument(level = "debug", skip(self))]
    fn read(&self, key: &str) -> RepositoryResult<Option<String>> {
        let path = self.slot_path(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => {
                debug!(bytes = contents.len(), "Slot read");
                Ok(Some(contents))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(RepositoryError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    #[instrument(level = "debug", skip(self, value), fields(bytes = value.len()))]
    fn write(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let path = self.slot_path(key)?;
        let tmp_path = path.with_extension("json.tmp");
        let io_err = |source| RepositoryError::Io {
            key: key.to_string(),
            source,
        };

        fs::write(&tmp_path, value).map_err(io_err)?;
        fs::rename(&tmp_path, &path).map_err(io_err)?;
        debug!("Slot written");
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    fn delete(&self, key: &str) -> RepositoryResult<()> {
        let path = self.slot_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Slot deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(RepositoryError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemorySlotStore::new();

        assert!(store.read("cart").unwrap().is_none());
        store.write("cart", "[]").unwrap();
        assert_eq!(store.read("cart").unwrap().as_deref(), Some("[]"));

        store.delete("cart").unwrap();
        assert!(!store.contains("cart"));
        store.delete("cart").unwrap();
    }

    #[test]
    fn test_memory_store_seeded() {
        let store = MemorySlotStore::with_slots([("user", "true"), ("role", "ADMIN")]);
        assert_eq!(store.read("role").unwrap().as_deref(), Some("ADMIN"));
    }

    #[test]
    fn test_file_store_overwrites_and_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSlotStore::open(dir.path().join("slots")).unwrap();

        store.write("cart", r#"[{"a":1}]"#).unwrap();
        store.write("cart", "[]").unwrap();
        assert_eq!(store.read("cart").unwrap().as_deref(), Some("[]"));
        assert!(!dir.path().join("slots/cart.json.tmp").exists());

        store.delete("cart").unwrap();
        assert!(store.read("cart").unwrap().is_none());
        assert!(!dir.path().join("slots/cart.json").exists());
    }

    #[test]
    fn test_file_store_missing_slot() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSlotStore::open(dir.path()).unwrap();

        assert!(store.read("never-written").unwrap().is_none());
        assert!(store.delete("never-written").is_ok());
    }

    #[test]
    fn test_file_store_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSlotStore::open(dir.path()).unwrap();

        for key in ["", "..", "../escape", "a/b", "cart slot"] {
            match store.write(key, "[]") {
                Err(RepositoryError::InvalidKey { .. }) => {}
                other => panic!("Expected InvalidKey for {:?}, got {:?}", key, other),
            }
        }
    }
}
