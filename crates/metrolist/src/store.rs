//! Injected key-value persistence for search preferences.
//!
//! Values are stored as strings, either JSON documents (`filters`) or primitive
//! encodings (`"true"`, `"55"`). Writes are synchronous and happen after every
//! successful state transition.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::warn;

pub const FILTERS_KEY: &str = "filters";
pub const FILTERS_UNDO_KEY: &str = "filters--undo";
pub const AMI_RECOMMENDATION_KEY: &str = "amiRecommendation";
pub const USE_AMI_RECOMMENDATION_KEY: &str = "useAmiRecommendationAsLowerBound";
pub const USE_HOUSEHOLD_INCOME_KEY: &str = "useHouseholdIncomeAsIncomeQualificationFilter";
pub const USE_HOUSEHOLD_INCOME_UNDO_KEY: &str =
    "useHouseholdIncomeAsIncomeQualificationFilter--undo";
pub const HOUSEHOLD_INCOME_KEY: &str = "householdIncome";

/// Storage abstraction so sessions can be exercised without a browser or disk.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode state: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("state store lock poisoned")]
    Poisoned,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self {
            entries: Mutex::new(entries),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let guard = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut guard = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut guard = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        guard.remove(key);
        Ok(())
    }
}

/// File-backed store; the whole map is rewritten on each mutation.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file starts empty; an unreadable one is discarded.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "discarding corrupt state file");
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let encoded = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, encoded).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let guard = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut guard = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        guard.insert(key.to_string(), value.to_string());
        self.flush(&guard)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut guard = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        if guard.remove(key).is_some() {
            self.flush(&guard)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("metrolist-store-{}-{name}.json", std::process::id()));
        let _ = std::fs::remove_file(&path);
        path
    }

    #[test]
    fn memory_store_round_trips_values() {
        let store = MemoryStore::new();
        store.set(FILTERS_KEY, "{}").expect("set");
        assert_eq!(store.get(FILTERS_KEY).expect("get").as_deref(), Some("{}"));
        store.remove(FILTERS_KEY).expect("remove");
        assert!(store.get(FILTERS_KEY).expect("get").is_none());
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let path = scratch_path("reopen");
        {
            let store = JsonFileStore::open(&path).expect("open empty");
            store.set(AMI_RECOMMENDATION_KEY, "55").expect("set");
        }

        let reopened = JsonFileStore::open(&path).expect("reopen");
        assert_eq!(
            reopened.get(AMI_RECOMMENDATION_KEY).expect("get").as_deref(),
            Some("55")
        );
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn file_store_discards_corrupt_contents() {
        let path = scratch_path("corrupt");
        std::fs::write(&path, "not json").expect("write fixture");

        let store = JsonFileStore::open(&path).expect("corrupt file tolerated");
        assert!(store.get(FILTERS_KEY).expect("get").is_none());
        let _ = std::fs::remove_file(&path);
    }
}
