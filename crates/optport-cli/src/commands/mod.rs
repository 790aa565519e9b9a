pub mod config;
pub mod export;
pub mod import;
pub mod option;

use optport_core::storage::SettingsStore;
use optport_core::{Config, FilterLists, SqliteStore, CURRENT_VERSION, MIN_SUPPORTED_VERSION};
use std::path::PathBuf;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Options shared by every command.
pub struct Context {
    store_override: Option<PathBuf>,
}

impl Context {
    pub fn new(store_override: Option<PathBuf>) -> Self {
        Self { store_override }
    }

    pub fn load_config(&self) -> Result<Config, Box<dyn std::error::Error>> {
        Ok(Config::load()?)
    }

    /// Open the store named by `--store`, falling back to the config.
    pub fn open_store(&self, config: &Config) -> Result<SqliteStore, Box<dyn std::error::Error>> {
        let path = match &self.store_override {
            Some(path) => path.clone(),
            None => config.store_path()?,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let store = SqliteStore::open(&path)?;
        tracing::debug!(path = %path.display(), options = store.names()?.len(), "store opened");
        Ok(store)
    }

    pub fn filters(&self, config: &Config) -> Result<FilterLists, Box<dyn std::error::Error>> {
        Ok(config.filter_lists()?)
    }
}

pub fn print_version() {
    println!("optport {}", env!("CARGO_PKG_VERSION"));
    println!("Export format version: {CURRENT_VERSION}");
    println!("Oldest importable version: {MIN_SUPPORTED_VERSION}");
}
