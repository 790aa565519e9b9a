//! Which names an import run attempts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::document::SettingsDocument;
use crate::error::ValidationError;
use crate::filters::FilterLists;

/// How the caller picked the names to import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// The resolved allow-list.
    #[default]
    Default,
    /// Every option in the file.
    All,
    /// Exactly the names the caller listed.
    Specific,
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SelectionMode::Default => "default",
            SelectionMode::All => "all",
            SelectionMode::Specific => "specific",
        };
        write!(f, "{s}")
    }
}

impl FromStr for SelectionMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(SelectionMode::Default),
            "all" => Ok(SelectionMode::All),
            "specific" => Ok(SelectionMode::Specific),
            other => Err(ValidationError::MalformedSelection(format!(
                "unknown selection mode '{other}'"
            ))),
        }
    }
}

/// Import-time decision about what to apply and whether to overwrite.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SelectionPolicy {
    pub mode: SelectionMode,
    /// Only consulted when `mode` is [`SelectionMode::Specific`].
    #[serde(default)]
    pub specific_keys: Vec<String>,
    /// Overwrite values that already exist in the live store.
    #[serde(default)]
    pub override_existing: bool,
}

impl SelectionPolicy {
    pub fn defaults(override_existing: bool) -> Self {
        Self {
            mode: SelectionMode::Default,
            specific_keys: Vec::new(),
            override_existing,
        }
    }

    pub fn all(override_existing: bool) -> Self {
        Self {
            mode: SelectionMode::All,
            specific_keys: Vec::new(),
            override_existing,
        }
    }

    pub fn specific<I, K>(keys: I, override_existing: bool) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            mode: SelectionMode::Specific,
            specific_keys: keys.into_iter().map(Into::into).collect(),
            override_existing,
        }
    }
}

/// Clean a caller-supplied setting name: strip markup tags, drop control
/// characters, collapse whitespace runs and trim.
pub fn sanitize_setting_name(raw: &str) -> String {
    let mut untagged = String::with_capacity(raw.len());
    let mut in_tag = false;
    for c in raw.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if in_tag => {}
            c if c.is_control() => untagged.push(' '),
            c => untagged.push(c),
        }
    }
    untagged.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolve the ordered list of names an import run should attempt.
///
/// `Default` returns the allow-list whether or not each name is in the
/// document; presence is checked per key when applying.
///
/// # Errors
/// Returns [`ValidationError::MalformedSelection`] when a specific selection
/// has no usable names.
pub fn resolve_selection(
    document: &SettingsDocument,
    policy: &SelectionPolicy,
    filters: &FilterLists,
) -> Result<Vec<String>, ValidationError> {
    match policy.mode {
        SelectionMode::All => Ok(document.options.keys().cloned().collect()),
        SelectionMode::Default => Ok(filters.import_allowlist().to_vec()),
        SelectionMode::Specific => {
            let names: Vec<String> = policy
                .specific_keys
                .iter()
                .map(|k| sanitize_setting_name(k))
                .filter(|k| !k.is_empty())
                .collect();
            if names.is_empty() {
                return Err(ValidationError::MalformedSelection(
                    "there do not appear to be any options to import; did you select any?"
                        .to_string(),
                ));
            }
            Ok(names)
        }
    }
}
