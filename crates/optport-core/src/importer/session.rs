//! Two-step import: upload and validate, then apply a selection.
//!
//! The parsed document is parked in an [`ImportCache`] between the steps so
//! the caller can show a preview and come back with a selection.

use serde::Serialize;
use std::path::Path;

use crate::codec::decode;
use crate::document::{check_document, validate_document, SettingsDocument};
use crate::error::{CoreError, Result, ValidationError};
use crate::filters::FilterLists;
use crate::storage::{cache_key, ImportCache, SettingsStore, UploadSource, IMPORT_TTL};

use super::apply::{ImportOutcome, Importer};
use super::selection::{resolve_selection, SelectionMode, SelectionPolicy};

/// A validated upload waiting for the apply step.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingImport {
    pub id: String,
    pub document: SettingsDocument,
}

/// One line of the pre-import listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewRow {
    pub name: String,
    /// Human-readable form of the decoded value.
    pub value: String,
    /// On the import allow-list, so selected by default.
    pub preselected: bool,
    /// Already present in the live store.
    pub exists: bool,
}

/// What an apply step did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub id: String,
    pub mode: SelectionMode,
    pub override_existing: bool,
    pub outcomes: Vec<(String, ImportOutcome)>,
}

impl ImportReport {
    /// Build a report; absent names only matter when the caller listed them.
    fn new(id: &str, policy: &SelectionPolicy, outcomes: Vec<(String, ImportOutcome)>) -> Self {
        let outcomes = if policy.mode == SelectionMode::Specific {
            outcomes
        } else {
            outcomes
                .into_iter()
                .filter(|(_, o)| *o != ImportOutcome::NotInFile)
                .collect()
        };
        Self {
            id: id.to_string(),
            mode: policy.mode,
            override_existing: policy.override_existing,
            outcomes,
        }
    }

    pub fn applied(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_applied()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, ImportOutcome::StoreError(_)))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.applied() - self.failed()
    }
}

/// Drives the upload/preview/apply flow against a store and a cache.
pub struct ImportSession<'a, S, C>
where
    S: SettingsStore + ?Sized,
    C: ImportCache + ?Sized,
{
    store: &'a mut S,
    cache: &'a mut C,
    filters: &'a FilterLists,
}

impl<'a, S, C> ImportSession<'a, S, C>
where
    S: SettingsStore + ?Sized,
    C: ImportCache + ?Sized,
{
    pub fn new(store: &'a mut S, cache: &'a mut C, filters: &'a FilterLists) -> Self {
        Self {
            store,
            cache,
            filters,
        }
    }

    /// Accept an upload, validate it and park the document for later.
    ///
    /// The staged file is always disposed of. On failure nothing stays in
    /// the cache under the upload's key.
    ///
    /// # Errors
    /// Returns the upload or validation failure, or a cache error.
    pub fn upload<U: UploadSource + ?Sized>(&mut self, uploads: &mut U) -> Result<PendingImport> {
        let upload = uploads.handle_upload()?;
        let key = cache_key(&upload.id);

        let checked = read_upload(&upload.path).and_then(|raw| validate_document(&raw));
        uploads.cleanup(&upload.id);

        let document = match checked {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(id = %upload.id, error = %e, "upload rejected");
                self.cache.delete(&key)?;
                return Err(e.into());
            }
        };

        self.cache.put(&key, &document, IMPORT_TTL)?;
        tracing::info!(
            id = %upload.id,
            version = document.version,
            options = document.options.len(),
            "import file accepted"
        );
        Ok(PendingImport {
            id: upload.id,
            document,
        })
    }

    /// Fetch a pending document, re-checking it.
    fn pending(&mut self, id: &str) -> Result<SettingsDocument> {
        let key = cache_key(id);
        let document = self
            .cache
            .get(&key)?
            .ok_or_else(|| CoreError::ImportNotFound(id.to_string()))?;
        if let Err(e) = check_document(&document) {
            self.cache.delete(&key)?;
            return Err(e.into());
        }
        Ok(document)
    }

    /// List what a pending import would offer, leaving out names that can
    /// never be imported.
    ///
    /// # Errors
    /// Returns [`CoreError::ImportNotFound`] if the upload expired or was
    /// already applied, or a store error.
    pub fn preview(&mut self, id: &str) -> Result<Vec<PreviewRow>> {
        let document = self.pending(id)?;
        let mut rows = Vec::with_capacity(document.options.len());
        for (name, encoded) in &document.options {
            if self.filters.is_import_denied(name) {
                continue;
            }
            rows.push(PreviewRow {
                name: name.clone(),
                value: decode(encoded).to_string(),
                preselected: self.filters.is_import_allowed(name),
                exists: self.store.contains(name)?,
            });
        }
        Ok(rows)
    }

    /// Apply a pending import under `policy` and release it.
    ///
    /// A malformed selection keeps the pending document so the caller can
    /// retry. Otherwise the cache entry is removed whatever the per-key
    /// outcomes were.
    ///
    /// # Errors
    /// Returns [`CoreError::ImportNotFound`], a validation error, or a cache
    /// error.
    pub fn apply(&mut self, id: &str, policy: &SelectionPolicy) -> Result<ImportReport> {
        let document = self.pending(id)?;
        let names = resolve_selection(&document, policy, self.filters)?;

        let outcomes = Importer::new(&mut *self.store, self.filters).run_import(
            &document,
            &names,
            policy.override_existing,
        );
        self.cache.delete(&cache_key(id))?;

        let report = ImportReport::new(id, policy, outcomes);
        tracing::info!(
            id,
            mode = %policy.mode,
            applied = report.applied(),
            skipped = report.skipped(),
            failed = report.failed(),
            "import applied"
        );
        Ok(report)
    }

    /// Drop a pending import without applying it.
    ///
    /// # Errors
    /// Returns a cache error.
    pub fn cancel(&mut self, id: &str) -> Result<()> {
        self.cache.delete(&cache_key(id))?;
        tracing::info!(id, "import cancelled");
        Ok(())
    }

    /// Upload and apply in one go.
    ///
    /// # Errors
    /// As [`ImportSession::upload`] and [`ImportSession::apply`].
    pub fn run<U: UploadSource + ?Sized>(
        &mut self,
        uploads: &mut U,
        policy: &SelectionPolicy,
    ) -> Result<ImportReport> {
        let pending = self.upload(uploads)?;
        match self.apply(&pending.id, policy) {
            Ok(report) => Ok(report),
            Err(e) => {
                self.cache.delete(&cache_key(&pending.id))?;
                Err(e)
            }
        }
    }
}

fn read_upload(path: &Path) -> std::result::Result<Vec<u8>, ValidationError> {
    let unreadable = |message: String| ValidationError::FileUnreadable {
        path: path.to_path_buf(),
        message,
    };
    if !path.is_file() {
        return Err(unreadable("The file does not exist.".to_string()));
    }
    let raw = std::fs::read(path).map_err(|e| unreadable(e.to_string()))?;
    if raw.is_empty() {
        return Err(unreadable("Unable to fetch the file contents.".to_string()));
    }
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryCache, MemoryStore, Upload};
    use std::path::PathBuf;

    /// Serves one fixed file and records cleanups.
    struct FixedUpload {
        path: PathBuf,
        cleaned: Vec<String>,
    }

    impl UploadSource for FixedUpload {
        fn handle_upload(&mut self) -> std::result::Result<Upload, ValidationError> {
            Ok(Upload {
                id: "7".to_string(),
                path: self.path.clone(),
            })
        }

        fn cleanup(&mut self, id: &str) {
            self.cleaned.push(id.to_string());
        }
    }

    fn upload_with(contents: &str) -> (tempfile::TempDir, FixedUpload) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        std::fs::write(&path, contents).unwrap();
        (
            dir,
            FixedUpload {
                path,
                cleaned: Vec::new(),
            },
        )
    }

    const EXPORT: &str =
        r#"{"version": 7, "options": {"blogname": "Acme", "custom": "x", "cron": "[]"}, "no_autoload": ["cron"]}"#;

    #[test]
    fn upload_caches_document_and_cleans_up() {
        let (_dir, mut uploads) = upload_with(EXPORT);
        let mut store = MemoryStore::new();
        let mut cache = MemoryCache::new();
        let filters = FilterLists::standard();
        let pending = ImportSession::new(&mut store, &mut cache, &filters)
            .upload(&mut uploads)
            .unwrap();
        assert_eq!(pending.id, "7");
        assert_eq!(uploads.cleaned, vec!["7"]);
        assert!(cache.get(&cache_key("7")).unwrap().is_some());
    }

    #[test]
    fn invalid_upload_leaves_nothing_behind() {
        let (_dir, mut uploads) = upload_with(r#"{"version": 1, "options": {"a": 1}}"#);
        let mut store = MemoryStore::new();
        let mut cache = MemoryCache::new();
        let filters = FilterLists::standard();
        let err = ImportSession::new(&mut store, &mut cache, &filters)
            .upload(&mut uploads)
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::TooOld(1))));
        assert_eq!(uploads.cleaned, vec!["7"]);
        assert!(cache.is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn empty_file_is_unreadable() {
        let (_dir, mut uploads) = upload_with("");
        let mut store = MemoryStore::new();
        let mut cache = MemoryCache::new();
        let filters = FilterLists::standard();
        let err = ImportSession::new(&mut store, &mut cache, &filters)
            .upload(&mut uploads)
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::FileUnreadable { .. })
        ));
    }

    #[test]
    fn preview_marks_allowlisted_and_existing_names() {
        let (_dir, mut uploads) = upload_with(EXPORT);
        let mut store = MemoryStore::new();
        store.insert("custom", "old", true);
        let mut cache = MemoryCache::new();
        let filters = FilterLists::builder()
            .import_denylist(|_| vec!["cron".to_string()])
            .build();
        let mut session = ImportSession::new(&mut store, &mut cache, &filters);
        let pending = session.upload(&mut uploads).unwrap();
        let rows = session.preview(&pending.id).unwrap();
        assert_eq!(
            rows,
            vec![
                PreviewRow {
                    name: "blogname".into(),
                    value: "Acme".into(),
                    preselected: true,
                    exists: false,
                },
                PreviewRow {
                    name: "custom".into(),
                    value: "x".into(),
                    preselected: false,
                    exists: true,
                },
            ]
        );
    }

    #[test]
    fn apply_releases_pending_import() {
        let (_dir, mut uploads) = upload_with(EXPORT);
        let mut store = MemoryStore::new();
        let mut cache = MemoryCache::new();
        let filters = FilterLists::standard();
        let mut session = ImportSession::new(&mut store, &mut cache, &filters);
        let pending = session.upload(&mut uploads).unwrap();

        let report = session
            .apply(&pending.id, &SelectionPolicy::defaults(false))
            .unwrap();
        assert_eq!(
            report.outcomes,
            vec![
                ("blogname".to_string(), ImportOutcome::Applied),
                ("cron".to_string(), ImportOutcome::Applied),
            ]
        );
        assert!(matches!(
            session.apply(&pending.id, &SelectionPolicy::defaults(false)),
            Err(CoreError::ImportNotFound(_))
        ));
        assert!(cache.is_empty());
        assert_eq!(store.get("blogname").unwrap(), Some("Acme".into()));
        assert_eq!(store.autoload("cron").unwrap(), Some(false));
    }

    #[test]
    fn specific_report_keeps_missing_names() {
        let (_dir, mut uploads) = upload_with(EXPORT);
        let mut store = MemoryStore::new();
        let mut cache = MemoryCache::new();
        let filters = FilterLists::standard();
        let report = ImportSession::new(&mut store, &mut cache, &filters)
            .run(&mut uploads, &SelectionPolicy::specific(["cron", "nope"], false))
            .unwrap();
        assert_eq!(
            report.outcomes,
            vec![
                ("cron".to_string(), ImportOutcome::Applied),
                ("nope".to_string(), ImportOutcome::NotInFile),
            ]
        );
        assert_eq!(store.autoload("cron").unwrap(), Some(false));
    }

    #[test]
    fn malformed_selection_keeps_pending_import() {
        let (_dir, mut uploads) = upload_with(EXPORT);
        let mut store = MemoryStore::new();
        let mut cache = MemoryCache::new();
        let filters = FilterLists::standard();
        let mut session = ImportSession::new(&mut store, &mut cache, &filters);
        let pending = session.upload(&mut uploads).unwrap();
        let err = session
            .apply(&pending.id, &SelectionPolicy::specific(["  "], false))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::MalformedSelection(_))
        ));
        assert!(session.preview(&pending.id).is_ok());
        session.cancel(&pending.id).unwrap();
        assert!(matches!(
            session.preview(&pending.id),
            Err(CoreError::ImportNotFound(_))
        ));
    }
}
