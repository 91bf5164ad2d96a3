use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::StoreError;

/// Slot holding the JSON array of records.
pub const RECORDS_KEY: &str = "sft:records";
/// Slot holding the JSON settings object.
pub const SETTINGS_KEY: &str = "sft:settings";

/// A string key-value store with whole-value reads and writes.
pub trait KeyValueStore {
    /// Return the stored value, or None if the key has never been written.
    fn get(&self, key: &str) -> Option<String>;

    /// Overwrite the value stored under `key`.
    fn set(&mut self, key: &str, value: String) -> io::Result<()>;
}

/// Read a slot, falling back to the type's default if it is missing or unreadable.
pub fn load_slot<T, S>(store: &S, key: &str) -> T
where
    T: DeserializeOwned + Default,
    S: KeyValueStore + ?Sized,
{
    let Some(raw) = store.get(key) else {
        return T::default();
    };
    serde_json::from_str(&raw).unwrap_or_else(|err| {
        warn!(key, %err, "stored value cannot be parsed; using an empty default");
        T::default()
    })
}

/// Serialize the full value and overwrite the slot.
pub fn save_slot<T, S>(store: &mut S, key: &str, value: &T) -> Result<(), StoreError>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let raw = serde_json::to_string(value)?;
    debug!(key, bytes = raw.len(), "writing slot");
    store.set(key, raw)?;
    Ok(())
}

/// Keeps every slot in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    slots: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a store with some slots already filled.
    pub fn with_slots<K, V>(slots: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        MemoryStore {
            slots: slots
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.slots.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> io::Result<()> {
        self.slots.insert(key.to_owned(), value);
        Ok(())
    }
}

/// Stores each slot as a JSON file inside a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileStore { root: root.into() }
    }

    /// The file backing a given key.
    pub fn slot_path(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
            .collect();
        self.root.join(name + ".json")
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.slot_path(key)).ok()
    }

    fn set(&mut self, key: &str, value: String) -> io::Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root)?;
        }
        fs::write(self.slot_path(key), value)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use crate::Settings;

    #[rstest]
    #[case(None)]
    #[case(Some("not json"))]
    #[case(Some("{\"wrong\": \"shape\"}"))]
    fn test_load_falls_back_to_default(#[case] stored: Option<&str>) {
        let store = match stored {
            Some(raw) => MemoryStore::with_slots([(RECORDS_KEY, raw)]),
            None => MemoryStore::new(),
        };
        let records: Vec<crate::Record> = load_slot(&store, RECORDS_KEY);
        assert!(records.is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let mut store = MemoryStore::new();
        let settings = Settings {
            budget_cap: Some("500".to_string()),
            ..Default::default()
        };
        save_slot(&mut store, SETTINGS_KEY, &settings).unwrap();
        assert_eq!(store.get(SETTINGS_KEY).unwrap(), r#"{"budgetCap":"500"}"#);
        let loaded: Settings = load_slot(&store, SETTINGS_KEY);
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_slot_path() {
        let store = FileStore::new("/data");
        assert_eq!(
            store.slot_path(RECORDS_KEY),
            PathBuf::from("/data/sft-records.json")
        );
        assert_eq!(
            store.slot_path(SETTINGS_KEY),
            PathBuf::from("/data/sft-settings.json")
        );
    }

    #[test]
    fn test_file_store_creates_directory() {
        let temp = tempdir::TempDir::new("test").unwrap();
        let root = temp.path().join("nested").join("data");
        let mut store = FileStore::new(&root);
        assert_eq!(store.get(RECORDS_KEY), None);

        store.set(RECORDS_KEY, "[]".to_string()).unwrap();
        assert!(root.is_dir());
        assert_eq!(store.get(RECORDS_KEY).unwrap(), "[]");
        assert_eq!(
            fs::read_to_string(root.join("sft-records.json")).unwrap(),
            "[]"
        );

        // Overwrites rather than appends.
        store.set(RECORDS_KEY, "[1]".to_string()).unwrap();
        assert_eq!(store.get(RECORDS_KEY).unwrap(), "[1]");
    }
}
