//! Short-lived storage for parsed import documents between import steps.
//!
//! Entries carry an expiry; an expired entry reads as absent and is removed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::document::SettingsDocument;
use crate::error::Result;

/// How long a parsed upload stays available for the apply step.
pub const IMPORT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Cache key for the upload identified by `file_id`.
pub fn cache_key(file_id: &str) -> String {
    format!("options-import-{file_id}")
}

/// Cache collaborator for pending imports.
pub trait ImportCache {
    fn put(&mut self, key: &str, document: &SettingsDocument, ttl: Duration) -> Result<()>;

    /// The cached document, or `None` if absent or expired.
    fn get(&mut self, key: &str) -> Result<Option<SettingsDocument>>;

    /// Remove an entry. Removing an absent key is not an error.
    fn delete(&mut self, key: &str) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedDocument {
    expires_at: DateTime<Utc>,
    document: SettingsDocument,
}

impl CachedDocument {
    fn new(document: &SettingsDocument, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        Self {
            expires_at: Utc::now().checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
            document: document.clone(),
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Cache held in process memory.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: HashMap<String, CachedDocument>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ImportCache for MemoryCache {
    fn put(&mut self, key: &str, document: &SettingsDocument, ttl: Duration) -> Result<()> {
        self.entries
            .insert(key.to_string(), CachedDocument::new(document, ttl));
        Ok(())
    }

    fn get(&mut self, key: &str) -> Result<Option<SettingsDocument>> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(Utc::now()),
            None => return Ok(None),
        };
        if expired {
            self.entries.remove(key);
            return Ok(None);
        }
        Ok(self.entries.get(key).map(|entry| entry.document.clone()))
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Cache of JSON files in a directory, one file per key.
///
/// Lets the upload and apply steps run as separate processes.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Use `dir` for cache files, creating it if needed.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

impl ImportCache for FileCache {
    fn put(&mut self, key: &str, document: &SettingsDocument, ttl: Duration) -> Result<()> {
        let entry = CachedDocument::new(document, ttl);
        std::fs::write(self.entry_path(key), serde_json::to_vec(&entry)?)?;
        Ok(())
    }

    fn get(&mut self, key: &str) -> Result<Option<SettingsDocument>> {
        let path = self.entry_path(key);
        let raw = match std::fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let entry: CachedDocument = match serde_json::from_slice(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding unreadable cache entry");
                self.delete(key)?;
                return Ok(None);
            }
        };
        if entry.is_expired(Utc::now()) {
            tracing::debug!(key, "cache entry expired");
            self.delete(key)?;
            return Ok(None);
        }
        Ok(Some(entry.document))
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        match std::fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
