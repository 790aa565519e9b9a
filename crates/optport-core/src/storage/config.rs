//! TOML-based application configuration.
//!
//! Stores:
//! - Where the settings store lives
//! - Export deny-list and deny pattern
//! - Import allow-list extensions, deny-list and deny pattern
//! - The site name used in export filenames
//!
//! Every list and pattern also has a legacy-named field, read for backward
//! compatibility and unioned with the current one. The pattern fields can be
//! overridden from the environment, see [`Config::filter_lists`].
//!
//! Configuration is stored at `~/.config/optport/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::filters::{DenyPattern, FilterLists, FilterListsBuilder};

/// Environment variable overriding `export.denylist_regex`.
pub const ENV_EXPORT_DENYLIST_REGEX: &str = "OPTPORT_EXPORT_DENYLIST_REGEX";
/// Environment variable overriding `export.legacy_blacklist_regex`.
pub const ENV_EXPORT_BLACKLIST_REGEX: &str = "OPTPORT_EXPORT_BLACKLIST_REGEX";
/// Environment variable overriding `import.denylist_regex`.
pub const ENV_IMPORT_DENYLIST_REGEX: &str = "OPTPORT_IMPORT_DENYLIST_REGEX";
/// Environment variable overriding `import.legacy_blacklist_regex`.
pub const ENV_IMPORT_BLACKLIST_REGEX: &str = "OPTPORT_IMPORT_BLACKLIST_REGEX";

/// Settings store location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite file; defaults to `options.db` in the data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Export policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub denylist: Vec<String>,
    #[serde(default)]
    pub legacy_blacklist: Vec<String>,
    #[serde(default)]
    pub denylist_regex: Option<String>,
    #[serde(default)]
    pub legacy_blacklist_regex: Option<String>,
}

/// Import policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Names added to the stock allow-list.
    #[serde(default)]
    pub allowlist: Vec<String>,
    #[serde(default)]
    pub legacy_whitelist: Vec<String>,
    #[serde(default)]
    pub denylist: Vec<String>,
    #[serde(default)]
    pub legacy_blacklist: Vec<String>,
    #[serde(default)]
    pub denylist_regex: Option<String>,
    #[serde(default)]
    pub legacy_blacklist_regex: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub name: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/optport/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub site: SiteConfig,
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::InvalidValue {
            key: key.to_string(),
            message: "unknown config key".to_string(),
        };
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Array(_) => {
                        let parsed: serde_json::Value =
                            serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?;
                        if !parsed.is_array() {
                            return Err(invalid("expected a JSON array".to_string()));
                        }
                        parsed
                    }
                    // An empty value clears optional fields; `set` falls back
                    // to an empty string for required ones.
                    _ if value.is_empty() => serde_json::Value::Null,
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Default location of the config file.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file does not exist.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or the
    /// defaults cannot be written.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    ///
    /// # Errors
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`.
    ///
    /// # Errors
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key. List fields take a JSON array.
    ///
    /// The change is made in memory only; call [`save`](Self::save) to persist.
    ///
    /// # Errors
    /// Returns an error if the key is unknown or the value cannot be parsed.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let original = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        let mut json = original.clone();
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated = match serde_json::from_value(json) {
            Ok(config) => config,
            // Required string fields take the empty value as-is.
            Err(_) if value.is_empty() => {
                let mut json = original;
                let pointer = format!("/{}", key.replace('.', "/"));
                if let Some(leaf) = json.pointer_mut(&pointer) {
                    *leaf = serde_json::Value::String(String::new());
                }
                serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?
            }
            Err(e) => return Err(invalid(e.to_string())),
        };
        *self = updated;
        Ok(())
    }

    /// Path of the settings store.
    ///
    /// # Errors
    /// Returns an error if no path is configured and the data directory is
    /// unavailable.
    pub fn store_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.store.path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("options.db")),
        }
    }

    /// Directory holding staged uploads.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable.
    pub fn staging_dir() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("uploads"))
    }

    /// Directory holding pending import documents.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable.
    pub fn cache_dir() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("cache"))
    }

    /// Resolve the filter lists, reading pattern overrides from the process
    /// environment.
    ///
    /// # Errors
    /// Returns an error if a configured pattern does not compile.
    pub fn filter_lists(&self) -> Result<FilterLists, ConfigError> {
        self.filter_lists_with_env(|var| std::env::var(var).ok())
    }

    /// Resolve the filter lists with an explicit environment lookup.
    ///
    /// A non-empty environment value replaces the matching config field.
    ///
    /// # Errors
    /// Returns an error if a pattern does not compile.
    pub fn filter_lists_with_env(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<FilterLists, ConfigError> {
        let pattern = |var: &str, configured: &Option<String>| -> Result<Option<DenyPattern>, ConfigError> {
            let raw = env(var)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| configured.clone().filter(|v| !v.trim().is_empty()));
            raw.map(|r| DenyPattern::parse(&r)).transpose()
        };

        let mut builder = FilterListsBuilder::new()
            .export_denylist(extend_with(self.export.denylist.clone()))
            .legacy_export_denylist(extend_with(self.export.legacy_blacklist.clone()))
            .import_allowlist(extend_with(self.import.allowlist.clone()))
            .legacy_import_allowlist(extend_with(self.import.legacy_whitelist.clone()))
            .import_denylist(extend_with(self.import.denylist.clone()))
            .legacy_import_denylist(extend_with(self.import.legacy_blacklist.clone()));

        if let Some(p) = pattern(ENV_EXPORT_DENYLIST_REGEX, &self.export.denylist_regex)? {
            builder = builder.export_denylist_pattern(p);
        }
        if let Some(p) = pattern(ENV_EXPORT_BLACKLIST_REGEX, &self.export.legacy_blacklist_regex)? {
            builder = builder.legacy_export_denylist_pattern(p);
        }
        if let Some(p) = pattern(ENV_IMPORT_DENYLIST_REGEX, &self.import.denylist_regex)? {
            builder = builder.import_denylist_pattern(p);
        }
        if let Some(p) = pattern(ENV_IMPORT_BLACKLIST_REGEX, &self.import.legacy_blacklist_regex)? {
            builder = builder.legacy_import_denylist_pattern(p);
        }

        Ok(builder.build())
    }
}

fn extend_with(extra: Vec<String>) -> impl FnOnce(Vec<String>) -> Vec<String> {
    move |mut list| {
        list.extend(extra);
        list
    }
}
