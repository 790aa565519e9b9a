//! # Optport Core Library
//!
//! Export and import of site settings between installations. Everything is
//! reachable from the `optport` CLI binary, which is a thin layer over this
//! crate.
//!
//! ## Architecture
//!
//! - **Document**: the versioned JSON export format and its validation
//! - **Codec**: how structured setting values travel inside a document
//! - **Filters**: allow/deny lists and deny patterns, extensible by callers
//! - **Exporter / Importer**: reading a store into a document and applying a
//!   document back under a selection policy
//! - **Storage**: SQLite-backed settings store, import cache, staged uploads
//!   and TOML configuration
//!
//! ## Key Components
//!
//! - [`Exporter`]: builds a [`SettingsDocument`] from a [`SettingsStore`]
//! - [`ImportSession`]: upload, preview, apply and cancel
//! - [`FilterLists`]: resolved import/export policy
//! - [`Config`]: application configuration management

pub mod codec;
pub mod document;
pub mod error;
pub mod exporter;
pub mod filters;
pub mod importer;
pub mod storage;

pub use codec::{decode, encode, SettingValue};
pub use document::{
    check_document, export_filename, validate_document, SettingsDocument, CURRENT_VERSION,
    MIN_SUPPORTED_VERSION,
};
pub use error::{ConfigError, CoreError, StoreError, ValidationError};
pub use exporter::Exporter;
pub use filters::{DenyPattern, FilterLists, FilterListsBuilder, DEFAULT_IMPORT_ALLOWLIST};
pub use importer::{
    resolve_selection, sanitize_setting_name, ImportOutcome, ImportReport, ImportSession,
    Importer, PendingImport, PreviewRow, SelectionMode, SelectionPolicy,
};
pub use storage::{
    Config, FileCache, ImportCache, MemoryCache, MemoryStore, SettingsStore, SqliteStore,
    StagedUpload, Upload, UploadSource,
};
