//! Per-key import decisions and the batch loop.

use serde::Serialize;
use std::fmt;

use crate::codec::decode;
use crate::document::SettingsDocument;
use crate::filters::FilterLists;
use crate::storage::SettingsStore;

/// Result of attempting one name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ImportOutcome {
    Applied,
    NotInFile,
    SkippedDenied,
    SkippedExists,
    StoreError(String),
}

impl ImportOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ImportOutcome::Applied)
    }

    /// Short machine-readable status.
    pub fn status(&self) -> &'static str {
        match self {
            ImportOutcome::Applied => "applied",
            ImportOutcome::NotInFile => "not_in_file",
            ImportOutcome::SkippedDenied => "skipped_denied",
            ImportOutcome::SkippedExists => "skipped_exists",
            ImportOutcome::StoreError(_) => "store_error",
        }
    }
}

impl fmt::Display for ImportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportOutcome::Applied => write!(f, "Imported option."),
            ImportOutcome::NotInFile => {
                write!(f, "Failed to import option: this option was not found in the import file.")
            }
            ImportOutcome::SkippedDenied => {
                write!(f, "Skipped option because this installation does not allow it.")
            }
            ImportOutcome::SkippedExists => write!(f, "Skipped option because it currently exists."),
            ImportOutcome::StoreError(msg) => write!(f, "Failed to import option: {msg}"),
        }
    }
}

/// Applies a document's values to a store.
pub struct Importer<'a, S: SettingsStore + ?Sized> {
    store: &'a mut S,
    filters: &'a FilterLists,
}

impl<'a, S: SettingsStore + ?Sized> Importer<'a, S> {
    pub fn new(store: &'a mut S, filters: &'a FilterLists) -> Self {
        Self { store, filters }
    }

    /// Decide and, if permitted, apply a single name.
    ///
    /// Checks run in order: presence in the file, deny list, deny pattern,
    /// existing value (when not overriding). Never panics on store failures;
    /// they come back as [`ImportOutcome::StoreError`].
    pub fn import_one(
        &mut self,
        document: &SettingsDocument,
        name: &str,
        override_existing: bool,
    ) -> ImportOutcome {
        let Some(encoded) = document.options.get(name) else {
            return ImportOutcome::NotInFile;
        };
        if self.filters.is_import_denied_by_list(name)
            || self.filters.is_import_denied_by_pattern(name)
        {
            return ImportOutcome::SkippedDenied;
        }
        if !override_existing {
            match self.store.contains(name) {
                Ok(true) => return ImportOutcome::SkippedExists,
                Ok(false) => {}
                Err(e) => return ImportOutcome::StoreError(e.to_string()),
            }
        }

        let value = decode(encoded);
        let written = if document.is_no_autoload(name) {
            // add() refuses existing names, so clear first
            self.store
                .delete(name)
                .and_then(|_| self.store.add(name, &value, false))
        } else {
            self.store.update(name, &value)
        };

        match written {
            Ok(()) => ImportOutcome::Applied,
            Err(e) => ImportOutcome::StoreError(e.to_string()),
        }
    }

    /// Attempt every name in order. One outcome per input name; a failing
    /// name does not stop the run.
    pub fn run_import(
        &mut self,
        document: &SettingsDocument,
        names: &[String],
        override_existing: bool,
    ) -> Vec<(String, ImportOutcome)> {
        names
            .iter()
            .map(|name| {
                let outcome = self.import_one(document, name, override_existing);
                match &outcome {
                    ImportOutcome::Applied => tracing::debug!(option = %name, "imported"),
                    ImportOutcome::StoreError(msg) => {
                        tracing::warn!(option = %name, error = %msg, "import failed")
                    }
                    other => tracing::debug!(option = %name, outcome = other.status(), "skipped"),
                }
                (name.clone(), outcome)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{encode, SettingValue};
    use crate::filters::DenyPattern;
    use crate::storage::MemoryStore;
    use indexmap::IndexMap;
    use serde_json::json;

    fn doc(pairs: &[(&str, serde_json::Value)], no_autoload: &[&str]) -> SettingsDocument {
        let options: IndexMap<String, serde_json::Value> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        SettingsDocument::new(options, no_autoload.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn missing_name_is_not_in_file() {
        let mut store = MemoryStore::new();
        let filters = FilterLists::standard();
        let d = doc(&[("a", json!("1"))], &[]);
        let outcome = Importer::new(&mut store, &filters).import_one(&d, "b", true);
        assert_eq!(outcome, ImportOutcome::NotInFile);
        assert!(store.is_empty());
    }

    #[test]
    fn applies_and_decodes_structured_values() {
        let mut store = MemoryStore::new();
        let filters = FilterLists::standard();
        let list = SettingValue::List(vec!["x".into(), SettingValue::Int(2)]);
        let d = doc(&[("plugins", encode(&list))], &[]);
        let outcome = Importer::new(&mut store, &filters).import_one(&d, "plugins", false);
        assert_eq!(outcome, ImportOutcome::Applied);
        assert_eq!(store.get("plugins").unwrap(), Some(list));
        assert_eq!(store.autoload("plugins").unwrap(), Some(true));
    }

    #[test]
    fn existing_values_are_kept_without_override() {
        let mut store = MemoryStore::new();
        store.insert("blogname", "Old", true);
        let filters = FilterLists::standard();
        let d = doc(&[("blogname", json!("New"))], &[]);

        let outcome = Importer::new(&mut store, &filters).import_one(&d, "blogname", false);
        assert_eq!(outcome, ImportOutcome::SkippedExists);
        assert_eq!(store.get("blogname").unwrap(), Some("Old".into()));

        let outcome = Importer::new(&mut store, &filters).import_one(&d, "blogname", true);
        assert_eq!(outcome, ImportOutcome::Applied);
        assert_eq!(store.get("blogname").unwrap(), Some("New".into()));
    }

    #[test]
    fn deny_wins_over_override() {
        let mut store = MemoryStore::new();
        let filters = FilterLists::builder()
            .import_denylist(|mut l| {
                l.push("siteurl".to_string());
                l
            })
            .import_denylist_pattern(DenyPattern::parse("^mailserver_").unwrap())
            .build();
        let d = doc(
            &[("siteurl", json!("http://x")), ("mailserver_pass", json!("p"))],
            &[],
        );
        let mut importer = Importer::new(&mut store, &filters);
        assert_eq!(importer.import_one(&d, "siteurl", true), ImportOutcome::SkippedDenied);
        assert_eq!(
            importer.import_one(&d, "mailserver_pass", true),
            ImportOutcome::SkippedDenied
        );
        assert!(store.is_empty());
    }

    #[test]
    fn no_autoload_names_are_replaced_with_autoload_off() {
        let mut store = MemoryStore::new();
        store.insert("cron", "old", true);
        store.insert("later", "x", true);
        let filters = FilterLists::standard();
        let d = doc(&[("cron", json!("new")), ("fresh", json!(1))], &["cron", "fresh"]);
        let mut importer = Importer::new(&mut store, &filters);
        assert_eq!(importer.import_one(&d, "cron", true), ImportOutcome::Applied);
        assert_eq!(importer.import_one(&d, "fresh", true), ImportOutcome::Applied);
        assert_eq!(store.get("cron").unwrap(), Some("new".into()));
        assert_eq!(store.autoload("cron").unwrap(), Some(false));
        assert_eq!(store.autoload("fresh").unwrap(), Some(false));
    }

    #[test]
    fn store_rejection_is_reported_and_run_continues() {
        let mut store = MemoryStore::new();
        store.reject_writes_to("b");
        let filters = FilterLists::standard();
        let d = doc(&[("a", json!(1)), ("b", json!(2)), ("c", json!(3))], &[]);
        let names: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let outcomes = Importer::new(&mut store, &filters).run_import(&d, &names, true);
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0], ("a".to_string(), ImportOutcome::Applied));
        assert!(matches!(outcomes[1].1, ImportOutcome::StoreError(_)));
        assert_eq!(outcomes[2], ("c".to_string(), ImportOutcome::Applied));
        assert_eq!(store.get("c").unwrap(), Some(SettingValue::Int(3)));
    }

    #[test]
    fn reimport_is_idempotent() {
        let mut store = MemoryStore::new();
        let filters = FilterLists::standard();
        let d = doc(&[("a", json!("1")), ("b", json!(null))], &["b"]);
        let names: Vec<String> = vec!["a".into(), "b".into()];
        let first = Importer::new(&mut store, &filters).run_import(&d, &names, true);
        let snapshot = (store.get("a").unwrap(), store.get("b").unwrap(), store.autoload("b").unwrap());
        let second = Importer::new(&mut store, &filters).run_import(&d, &names, true);
        assert_eq!(first, second);
        assert_eq!(
            snapshot,
            (store.get("a").unwrap(), store.get("b").unwrap(), store.autoload("b").unwrap())
        );
    }

    #[test]
    fn outcome_display_and_status() {
        assert_eq!(ImportOutcome::Applied.status(), "applied");
        assert_eq!(
            ImportOutcome::StoreError("boom".into()).to_string(),
            "Failed to import option: boom"
        );
        assert_eq!(
            ImportOutcome::SkippedExists.to_string(),
            "Skipped option because it currently exists."
        );
        assert_eq!(
            ImportOutcome::SkippedDenied.to_string(),
            "Skipped option because this installation does not allow it."
        );
        assert_eq!(
            serde_json::to_value(ImportOutcome::SkippedExists).unwrap(),
            json!({"status": "skipped_exists"})
        );
    }
}
