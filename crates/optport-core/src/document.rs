//! The versioned export document and its validation.
//!
//! ```json
//! { "version": 7, "options": { "blogname": "Acme" }, "no_autoload": ["cron"] }
//! ```

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// Format version written by this exporter.
pub const CURRENT_VERSION: i64 = 7;

/// Oldest document version the importer accepts.
pub const MIN_SUPPORTED_VERSION: i64 = 2;

/// An export/import artifact.
///
/// `options` keeps the order the exporter enumerated the store in.
/// Names in `no_autoload` are not required to appear in `options`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettingsDocument {
    pub version: i64,
    pub options: IndexMap<String, Value>,
    #[serde(default)]
    pub no_autoload: Vec<String>,
}

impl SettingsDocument {
    /// Create a document at the current format version.
    pub fn new(options: IndexMap<String, Value>, no_autoload: Vec<String>) -> Self {
        Self {
            version: CURRENT_VERSION,
            options,
            no_autoload,
        }
    }

    /// Whether the document carries a value for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.options.contains_key(name)
    }

    /// Whether `name` must be stored with autoload disabled.
    pub fn is_no_autoload(&self, name: &str) -> bool {
        self.no_autoload.iter().any(|n| n == name)
    }

    /// Serialize the document to a pretty-printed JSON string.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Parse and validate an uploaded export file.
///
/// The checks run in a fixed order, so a file that is both too old and empty
/// reports [`ValidationError::TooOld`].
///
/// # Errors
/// Returns the first validation failure encountered.
pub fn validate_document(raw: &[u8]) -> Result<SettingsDocument, ValidationError> {
    let parsed: Value = serde_json::from_slice(raw).map_err(|_| ValidationError::Corrupt)?;
    let obj = parsed.as_object().ok_or(ValidationError::Corrupt)?;

    let version = obj
        .get("version")
        .and_then(truthy_version)
        .ok_or(ValidationError::Corrupt)?;

    if version < MIN_SUPPORTED_VERSION {
        return Err(ValidationError::TooOld(version));
    }
    if version > CURRENT_VERSION {
        return Err(ValidationError::TooNew(version));
    }

    let options = match obj.get("options") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => {
            return Err(ValidationError::NoOptions)
        }
        Some(Value::Object(map)) if map.is_empty() => return Err(ValidationError::NoOptions),
        Some(Value::Array(items)) if items.is_empty() => return Err(ValidationError::NoOptions),
        Some(Value::Object(map)) => map,
        Some(_) => return Err(ValidationError::Corrupt),
    };
    if options.keys().any(|k| k.is_empty()) {
        return Err(ValidationError::Corrupt);
    }

    let no_autoload = match obj.get("no_autoload") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or(ValidationError::Corrupt)?,
        Some(_) => return Err(ValidationError::Corrupt),
    };

    Ok(SettingsDocument {
        version,
        options: options
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        no_autoload,
    })
}

/// Re-check an already parsed document, e.g. one read back from the cache.
///
/// # Errors
/// Returns [`ValidationError::TooOld`], [`ValidationError::TooNew`] or
/// [`ValidationError::NoOptions`].
pub fn check_document(document: &SettingsDocument) -> Result<(), ValidationError> {
    if document.version < MIN_SUPPORTED_VERSION {
        return Err(ValidationError::TooOld(document.version));
    }
    if document.version > CURRENT_VERSION {
        return Err(ValidationError::TooNew(document.version));
    }
    if document.options.is_empty() {
        return Err(ValidationError::NoOptions);
    }
    Ok(())
}

/// Read a version field the way older exporters wrote it: integers,
/// integral floats, or numeric strings. Zero counts as missing.
fn truthy_version(value: &Value) -> Option<i64> {
    let version = match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => i,
            None => {
                let f = n.as_f64()?;
                if f.fract() != 0.0 || !f.is_finite() {
                    return None;
                }
                f as i64
            }
        },
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    (version != 0).then_some(version)
}

/// Build the download filename, e.g. `acme.wp_options.2024-05-01.json`.
///
/// The site name is reduced to a lowercase key of `[a-z0-9_-]`; when nothing
/// survives the prefix is omitted.
pub fn export_filename(site_name: &str, date: NaiveDate) -> String {
    let key = sanitize_key(site_name);
    let prefix = if key.is_empty() {
        String::new()
    } else {
        format!("{key}.")
    };
    format!("{prefix}wp_options.{}.json", date.format("%Y-%m-%d"))
}

fn sanitize_key(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}
