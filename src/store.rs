use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::storage::{load_slot, save_slot, KeyValueStore, RECORDS_KEY, SETTINGS_KEY};
use crate::validators::{validate_custom_category, FieldError};
use crate::{Record, RecordPatch, Settings, StoreError, BUILTIN_CATEGORIES};

/// Digits following the first underscore of an id such as `rec_0042`.
static RE_ID_SEQUENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^_]*_([0-9]+)").unwrap());

const ID_PREFIX: &str = "rec_";

/// The in-memory records and settings, written through to a key-value store
/// after every change.
#[derive(Debug)]
pub struct RecordStore<S: KeyValueStore> {
    records: Vec<Record>,
    settings: Settings,
    backend: S,
}

impl<S: KeyValueStore> RecordStore<S> {
    /// Load both slots from the backend. Missing or unreadable slots start empty.
    pub fn init(backend: S) -> Self {
        let records: Vec<Record> = load_slot(&backend, RECORDS_KEY);
        let settings: Settings = load_slot(&backend, SETTINGS_KEY);
        debug!(records = records.len(), "record store loaded");
        RecordStore {
            records,
            settings,
            backend,
        }
    }

    /// Write both slots to the backend.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        self.save_records()?;
        self.save_settings()
    }

    /// Give up the store and return its backend.
    pub fn into_backend(self) -> S {
        self.backend
    }

    /// A read-only view of the records in insertion order.
    pub fn list(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The next id in the `rec_NNNN` sequence: one past the highest
    /// numeric suffix currently present.
    ///
    /// Fails once an (imported) id already holds the largest suffix there is.
    pub fn generate_id(&self) -> Result<String, StoreError> {
        let max = self
            .records
            .iter()
            .filter_map(|r| id_sequence(&r.id))
            .max()
            .unwrap_or(0);
        let next = max.checked_add(1).ok_or(StoreError::IdsExhausted(max))?;
        Ok(format!("{ID_PREFIX}{next:04}"))
    }

    /// Append a record and persist.
    pub fn add(&mut self, record: Record) -> Result<(), StoreError> {
        if self.contains(&record.id) {
            return Err(StoreError::DuplicateId(record.id));
        }
        debug!(id = %record.id, "adding record");
        self.records.push(record);
        self.save_records()
    }

    /// Append several records with a single write. Nothing is added if any
    /// id is already taken or repeated within the batch.
    pub fn add_many(&mut self, records: Vec<Record>) -> Result<(), StoreError> {
        let mut seen: HashSet<&str> = self.records.iter().map(|r| r.id.as_str()).collect();
        for record in records.iter() {
            if !seen.insert(&record.id) {
                return Err(StoreError::DuplicateId(record.id.to_owned()));
            }
        }
        debug!(count = records.len(), "adding records");
        self.records.extend(records);
        self.save_records()
    }

    /// Merge `patch` into the record with the given id.
    ///
    /// Returns false, without writing, if no such record exists.
    pub fn update(&mut self, id: &str, patch: RecordPatch) -> Result<bool, StoreError> {
        let Some(record) = self.records.iter_mut().find(|r| r.id == id) else {
            return Ok(false);
        };
        record.apply(patch);
        debug!(id, "updated record");
        self.save_records()?;
        Ok(true)
    }

    /// Remove the record with the given id. Unknown ids are ignored.
    pub fn delete(&mut self, id: &str) -> Result<bool, StoreError> {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        if self.records.len() == before {
            return Ok(false);
        }
        debug!(id, "deleted record");
        self.save_records()?;
        Ok(true)
    }

    /// Shallow-merge new settings and persist.
    pub fn update_settings(&mut self, update: Settings) -> Result<(), StoreError> {
        self.settings.merge(update);
        debug!(settings = ?self.settings, "updated settings");
        self.save_settings()
    }

    /// Built-in categories followed by custom ones, without repeats.
    pub fn categories(&self) -> Vec<&str> {
        let mut all: Vec<&str> = Vec::new();
        for name in BUILTIN_CATEGORIES
            .iter()
            .copied()
            .chain(self.settings.custom_categories().iter().map(String::as_str))
        {
            if !all.contains(&name) {
                all.push(name);
            }
        }
        all
    }

    pub fn is_known_category(&self, name: &str) -> bool {
        self.categories().contains(&name)
    }

    /// Validate and append a custom category, returning the stored name.
    pub fn add_custom_category(&mut self, name: &str) -> Result<String, StoreError> {
        let name = name.trim();
        validate_custom_category(name)?;
        if self
            .categories()
            .iter()
            .any(|c| c.to_lowercase() == name.to_lowercase())
        {
            return Err(FieldError::CategoryExists.into());
        }
        let mut custom = self.settings.custom_categories().to_vec();
        custom.push(name.to_owned());
        self.update_settings(Settings {
            custom_categories: Some(custom),
            ..Default::default()
        })?;
        Ok(name.to_owned())
    }

    /// Remove a custom category. Returns false if it was not present.
    pub fn remove_custom_category(&mut self, name: &str) -> Result<bool, StoreError> {
        let custom = self.settings.custom_categories();
        if !custom.iter().any(|c| c == name) {
            return Ok(false);
        }
        let remaining = custom.iter().filter(|c| *c != name).cloned().collect();
        self.update_settings(Settings {
            custom_categories: Some(remaining),
            ..Default::default()
        })?;
        Ok(true)
    }

    fn save_records(&mut self) -> Result<(), StoreError> {
        save_slot(&mut self.backend, RECORDS_KEY, &self.records)
    }

    fn save_settings(&mut self) -> Result<(), StoreError> {
        save_slot(&mut self.backend, SETTINGS_KEY, &self.settings)
    }
}

/// The numeric sequence embedded in an id, if any.
fn id_sequence(id: &str) -> Option<u64> {
    RE_ID_SEQUENCE
        .captures(id)
        .and_then(|caps| caps[1].parse().ok())
}
