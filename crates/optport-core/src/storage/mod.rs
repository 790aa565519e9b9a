mod cache;
mod config;
mod memory;
pub mod migrations;
mod sqlite;
mod upload;

pub use cache::{cache_key, FileCache, ImportCache, MemoryCache, IMPORT_TTL};
pub use config::{Config, ExportConfig, ImportConfig, SiteConfig, StoreConfig};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use upload::{StagedUpload, Upload, UploadSource};

use std::path::PathBuf;

use crate::codec::SettingValue;
use crate::error::{ConfigError, StoreError};

/// Name prefixes of ephemeral runtime cache entries. Such names are never
/// configuration and are never exported.
pub const TRANSIENT_PREFIXES: &[&str] = &["_transient_", "_site_transient_"];

/// Whether `name` is an ephemeral cache entry rather than a setting.
pub fn is_transient(name: &str) -> bool {
    TRANSIENT_PREFIXES.iter().any(|p| name.starts_with(p))
}

/// A key-value settings store with a per-key autoload flag.
///
/// `get` returning `None` is the only signal that a name has no current
/// value; a stored `Null`, `false` or empty string is still a value.
pub trait SettingsStore {
    /// Every stored name, in the store's natural order.
    fn names(&self) -> Result<Vec<String>, StoreError>;

    /// The current value of `name`, or `None` if it has none.
    fn get(&self, name: &str) -> Result<Option<SettingValue>, StoreError>;

    /// The autoload flag of `name`, or `None` if it has no entry.
    fn autoload(&self, name: &str) -> Result<Option<bool>, StoreError>;

    /// Create `name` with an explicit autoload flag.
    ///
    /// Fails with [`StoreError::Rejected`] if the name already has an entry.
    fn add(&mut self, name: &str, value: &SettingValue, autoload: bool) -> Result<(), StoreError>;

    /// Insert or replace the value of `name`, keeping an existing autoload
    /// flag and defaulting new entries to autoload enabled.
    fn update(&mut self, name: &str, value: &SettingValue) -> Result<(), StoreError>;

    /// Remove `name`. Returns whether an entry existed.
    fn delete(&mut self, name: &str) -> Result<bool, StoreError>;

    /// Whether `name` currently holds a value.
    fn contains(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.get(name)?.is_some())
    }
}

/// Returns the data directory.
///
/// `OPTPORT_DATA_DIR` wins when set. Otherwise `~/.config/optport[-dev]/`,
/// where `OPTPORT_ENV=dev` selects the development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("OPTPORT_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("OPTPORT_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("optport-dev")
            } else {
                base_dir.join("optport")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
