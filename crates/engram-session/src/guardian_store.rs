//! Engrams the user guards, kept in local storage
//!
//! The list lives under one key as a JSON array of `{"canisterId": ".."}`
//! objects. Missing or unreadable data reads as an empty list.

use crate::error::{SessionError, StoreError};
use engram_core::CanisterId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Storage key of the guarded engram list
pub const GUARDIAN_ENGRAMS_KEY: &str = "engramx-guardian-engrams";

/// String key-value storage
pub trait KeyValueStore: Send + Sync {
    /// Value stored under `key`
    ///
    /// # Errors
    /// Returns `StoreError` if the backing storage cannot be read
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`
    ///
    /// # Errors
    /// Returns `StoreError` if the backing storage cannot be written
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`; removing a missing key succeeds
    ///
    /// # Errors
    /// Returns `StoreError` if the backing storage cannot be written
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Store backed by one JSON object file
///
/// The whole file is rewritten on every change. A file that is not a JSON
/// object is treated as empty and replaced by the next write.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        match serde_json::from_str(&raw) {
            Ok(entries) => Ok(entries),
            Err(error) => {
                tracing::warn!(path = %self.path.display(), %error, "ignoring unreadable store file");
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let raw = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, raw).map_err(|e| self.io_error(e))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

/// One guarded engram
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardianEngram {
    pub canister_id: CanisterId,
}

/// List of engrams the user guards
#[derive(Clone)]
pub struct GuardianSessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl GuardianSessionStore {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Store kept in memory only
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Store persisted to `path`
    #[must_use]
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileStore::new(path)))
    }

    /// Guarded engrams in insertion order
    ///
    /// Missing, unreadable or non-array data yields an empty list. Entries
    /// that do not hold a valid canister id are skipped one by one, so they
    /// never hide the valid entries around them.
    #[must_use]
    pub fn guardian_engrams(&self) -> Vec<GuardianEngram> {
        let raw = match self.store.get(GUARDIAN_ENGRAMS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(error) => {
                tracing::warn!(%error, "could not read guardian engrams");
                return Vec::new();
            }
        };
        let rows: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(rows) => rows,
            Err(error) => {
                tracing::debug!(%error, "discarding malformed guardian engram list");
                return Vec::new();
            }
        };
        rows.into_iter()
            .filter_map(|row| match serde_json::from_value(row) {
                Ok(entry) => Some(entry),
                Err(error) => {
                    tracing::debug!(%error, "skipping malformed guardian engram entry");
                    None
                }
            })
            .collect()
    }

    /// Whether `canister_id` is in the list
    #[must_use]
    pub fn contains(&self, canister_id: &CanisterId) -> bool {
        self.guardian_engrams()
            .iter()
            .any(|entry| &entry.canister_id == canister_id)
    }

    /// Append `canister_id` unless already listed
    ///
    /// Returns whether the list changed.
    ///
    /// # Errors
    /// Returns `SessionError::Store` if the list cannot be written
    pub fn add_guardian_engram(&self, canister_id: CanisterId) -> Result<bool, SessionError> {
        let mut engrams = self.guardian_engrams();
        if engrams.iter().any(|entry| entry.canister_id == canister_id) {
            return Ok(false);
        }
        engrams.push(GuardianEngram { canister_id });
        self.write(&engrams)?;
        Ok(true)
    }

    /// Remove `canister_id` from the list
    ///
    /// The list is rewritten even when nothing matched, which also replaces
    /// malformed data. Returns whether an entry was removed.
    ///
    /// # Errors
    /// Returns `SessionError::Store` if the list cannot be written
    pub fn remove_guardian_engram(&self, canister_id: &CanisterId) -> Result<bool, SessionError> {
        let mut engrams = self.guardian_engrams();
        let before = engrams.len();
        engrams.retain(|entry| &entry.canister_id != canister_id);
        self.write(&engrams)?;
        Ok(engrams.len() != before)
    }

    /// Forget every guarded engram
    ///
    /// # Errors
    /// Returns `SessionError::Store` if the key cannot be removed
    pub fn clear(&self) -> Result<(), SessionError> {
        self.store.remove(GUARDIAN_ENGRAMS_KEY)?;
        Ok(())
    }

    fn write(&self, engrams: &[GuardianEngram]) -> Result<(), SessionError> {
        let raw = serde_json::to_string(engrams).map_err(StoreError::from)?;
        self.store.set(GUARDIAN_ENGRAMS_KEY, &raw)?;
        Ok(())
    }
}

impl std::fmt::Debug for GuardianSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardianSessionStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(text: &str) -> CanisterId {
        CanisterId::parse(text).unwrap()
    }

    #[test]
    fn empty_by_default() {
        let store = GuardianSessionStore::in_memory();
        assert!(store.guardian_engrams().is_empty());
    }

    #[test]
    fn add_dedupes() {
        let store = GuardianSessionStore::in_memory();
        assert!(store.add_guardian_engram(id("rrkah-fqaaa-aaaaa-aaaaq-cai")).unwrap());
        assert!(!store.add_guardian_engram(id("rrkah-fqaaa-aaaaa-aaaaq-cai")).unwrap());
        assert!(store.add_guardian_engram(id("ryjl3-tyaaa-aaaaa-aaaba-cai")).unwrap());
        assert_eq!(store.guardian_engrams().len(), 2);
    }

    #[test]
    fn stored_shape() {
        let kv = Arc::new(MemoryStore::new());
        let store = GuardianSessionStore::new(kv.clone());
        store.add_guardian_engram(id("rrkah-fqaaa-aaaaa-aaaaq-cai")).unwrap();
        assert_eq!(
            kv.get(GUARDIAN_ENGRAMS_KEY).unwrap().as_deref(),
            Some(r#"[{"canisterId":"rrkah-fqaaa-aaaaa-aaaaq-cai"}]"#)
        );
    }

    #[test]
    fn malformed_list_reads_empty() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(GUARDIAN_ENGRAMS_KEY, "{not json").unwrap();
        let store = GuardianSessionStore::new(kv.clone());
        assert!(store.guardian_engrams().is_empty());

        kv.set(GUARDIAN_ENGRAMS_KEY, r#"[{"canisterId":"NOT AN ID"}]"#).unwrap();
        assert!(store.guardian_engrams().is_empty());
    }

    #[test]
    fn malformed_entries_are_skipped_individually() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(
            GUARDIAN_ENGRAMS_KEY,
            r#"[{"canisterId":"rrkah-fqaaa-aaaaa-aaaaq-cai"},{"canisterId":"Legacy_ID"},7]"#,
        )
        .unwrap();
        let store = GuardianSessionStore::new(kv);
        assert_eq!(
            store.guardian_engrams(),
            vec![GuardianEngram {
                canister_id: id("rrkah-fqaaa-aaaaa-aaaaq-cai")
            }]
        );
    }
}
