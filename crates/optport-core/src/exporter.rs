//! Reads the live settings store and builds the export document.

use indexmap::IndexMap;
use serde_json::Value;

use crate::codec::encode;
use crate::document::SettingsDocument;
use crate::error::StoreError;
use crate::filters::FilterLists;
use crate::storage::{is_transient, SettingsStore};

/// Builds export documents from a store under a set of filter lists.
///
/// Read-only: nothing here writes to the store.
pub struct Exporter<'a, S: SettingsStore + ?Sized> {
    store: &'a S,
    filters: &'a FilterLists,
}

impl<'a, S: SettingsStore + ?Sized> Exporter<'a, S> {
    pub fn new(store: &'a S, filters: &'a FilterLists) -> Self {
        Self { store, filters }
    }

    /// Distinct, non-transient names in store order.
    fn candidate_names(&self) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = Vec::new();
        for name in self.store.names()? {
            if !is_transient(&name) && !names.contains(&name) {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Every exportable setting with its encoded value.
    ///
    /// A name is left out when it is transient, denied by list or pattern,
    /// or has no current value.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub fn collect_exportable_settings(&self) -> Result<IndexMap<String, Value>, StoreError> {
        let mut options = IndexMap::new();
        for name in self.candidate_names()? {
            if self.filters.is_export_denied(&name) {
                tracing::debug!(option = %name, "excluded from export by deny policy");
                continue;
            }
            match self.store.get(&name)? {
                Some(value) => {
                    options.insert(name, encode(&value));
                }
                None => tracing::debug!(option = %name, "no current value, skipped"),
            }
        }
        Ok(options)
    }

    /// Names whose autoload flag is off.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub fn collect_no_autoload_names(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        for name in self.candidate_names()? {
            if self.store.autoload(&name)? == Some(false) {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Compose a document at the current format version.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub fn build_document(&self) -> Result<SettingsDocument, StoreError> {
        let options = self.collect_exportable_settings()?;
        let no_autoload = self.collect_no_autoload_names()?;
        if options.is_empty() {
            tracing::warn!("export contains no options");
        }
        tracing::info!(
            options = options.len(),
            no_autoload = no_autoload.len(),
            "export document built"
        );
        Ok(SettingsDocument::new(options, no_autoload))
    }
}
