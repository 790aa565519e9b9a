//! In-process settings store.

use indexmap::IndexMap;
use std::collections::HashSet;

use super::SettingsStore;
use crate::codec::SettingValue;
use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    value: SettingValue,
    autoload: bool,
}

/// Ordered in-memory store.
///
/// Names registered with [`reject_writes_to`](Self::reject_writes_to) refuse
/// every write, which stands in for a store that vetoes an update.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: IndexMap<String, Entry>,
    rejected: HashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entry directly, bypassing write rejection.
    pub fn insert(&mut self, name: &str, value: impl Into<SettingValue>, autoload: bool) {
        self.entries.insert(
            name.to_string(),
            Entry {
                value: value.into(),
                autoload,
            },
        );
    }

    /// Make every later write to `name` fail.
    pub fn reject_writes_to(&mut self, name: &str) {
        self.rejected.insert(name.to_string());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn check_writable(&self, name: &str) -> Result<(), StoreError> {
        if self.rejected.contains(name) {
            return Err(StoreError::Rejected {
                name: name.to_string(),
                reason: "write vetoed by store".to_string(),
            });
        }
        Ok(())
    }
}

impl SettingsStore for MemoryStore {
    fn names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.keys().cloned().collect())
    }

    fn get(&self, name: &str) -> Result<Option<SettingValue>, StoreError> {
        Ok(self.entries.get(name).map(|e| e.value.clone()))
    }

    fn autoload(&self, name: &str) -> Result<Option<bool>, StoreError> {
        Ok(self.entries.get(name).map(|e| e.autoload))
    }

    fn add(&mut self, name: &str, value: &SettingValue, autoload: bool) -> Result<(), StoreError> {
        self.check_writable(name)?;
        if self.entries.contains_key(name) {
            return Err(StoreError::Rejected {
                name: name.to_string(),
                reason: "option already exists".to_string(),
            });
        }
        self.insert(name, value.clone(), autoload);
        Ok(())
    }

    fn update(&mut self, name: &str, value: &SettingValue) -> Result<(), StoreError> {
        self.check_writable(name)?;
        match self.entries.get_mut(name) {
            Some(entry) => entry.value = value.clone(),
            None => self.insert(name, value.clone(), true),
        }
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<bool, StoreError> {
        self.check_writable(name)?;
        Ok(self.entries.shift_remove(name).is_some())
    }
}
