//! SQLite-backed settings store.
//!
//! Values are stored as the tagged JSON of [`SettingValue`], so every variant
//! (including `Null` and `false`) survives storage unchanged.

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::Path;

use super::{migrations, SettingsStore};
use crate::codec::SettingValue;
use crate::error::StoreError;

/// Settings store at a SQLite file.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (and migrate) the store at `path`, creating it if needed.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        migrations::migrate(&conn)?;
        Ok(Self { conn })
    }

    /// Open an existing store without write access. Every write is rejected.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened.
    pub fn open_read_only(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|source| StoreError::OpenFailed {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self { conn })
    }

    /// Open an in-memory store.
    ///
    /// # Errors
    /// Returns an error if migration fails.
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        migrations::migrate(&conn)?;
        Ok(Self { conn })
    }

    fn encode(name: &str, value: &SettingValue) -> Result<String, StoreError> {
        serde_json::to_string(value).map_err(|e| StoreError::Codec {
            name: name.to_string(),
            message: e.to_string(),
        })
    }
}

/// Attach the option name to a failed write.
fn write_error(name: &str, err: rusqlite::Error) -> StoreError {
    match StoreError::from(err) {
        StoreError::Rejected { reason, .. } => StoreError::Rejected {
            name: name.to_string(),
            reason,
        },
        other => other,
    }
}

impl SettingsStore for SqliteStore {
    fn names(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT option_name FROM options ORDER BY option_id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut names = Vec::new();
        for row in rows {
            names.push(row?);
        }
        Ok(names)
    }

    fn get(&self, name: &str) -> Result<Option<SettingValue>, StoreError> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT option_value FROM options WHERE option_name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|raw| {
            serde_json::from_str(&raw).map_err(|e| StoreError::Codec {
                name: name.to_string(),
                message: e.to_string(),
            })
        })
        .transpose()
    }

    fn autoload(&self, name: &str) -> Result<Option<bool>, StoreError> {
        let flag: Option<String> = self
            .conn
            .query_row(
                "SELECT autoload FROM options WHERE option_name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(flag.map(|f| f != "no"))
    }

    fn add(&mut self, name: &str, value: &SettingValue, autoload: bool) -> Result<(), StoreError> {
        let encoded = Self::encode(name, value)?;
        let inserted = self
            .conn
            .execute(
                "INSERT INTO options (option_name, option_value, autoload)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(option_name) DO NOTHING",
                params![name, encoded, if autoload { "yes" } else { "no" }],
            )
            .map_err(|e| write_error(name, e))?;
        if inserted == 0 {
            return Err(StoreError::Rejected {
                name: name.to_string(),
                reason: "option already exists".to_string(),
            });
        }
        Ok(())
    }

    fn update(&mut self, name: &str, value: &SettingValue) -> Result<(), StoreError> {
        let encoded = Self::encode(name, value)?;
        self.conn
            .execute(
                "INSERT INTO options (option_name, option_value, autoload)
                 VALUES (?1, ?2, 'yes')
                 ON CONFLICT(option_name) DO UPDATE SET option_value = excluded.option_value",
                params![name, encoded],
            )
            .map_err(|e| write_error(name, e))?;
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<bool, StoreError> {
        let removed = self
            .conn
            .execute("DELETE FROM options WHERE option_name = ?1", params![name])
            .map_err(|e| write_error(name, e))?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn values_round_trip_through_storage() {
        let mut store = SqliteStore::open_memory().unwrap();
        let mut map = IndexMap::new();
        map.insert("b".to_string(), SettingValue::Bool(false));
        map.insert("a".to_string(), SettingValue::Null);
        let value = SettingValue::Map(map);

        store.update("widget", &value).unwrap();
        store.update("empty", &"".into()).unwrap();
        store.update("off", &SettingValue::Bool(false)).unwrap();

        assert_eq!(store.get("widget").unwrap(), Some(value));
        assert_eq!(store.get("empty").unwrap(), Some("".into()));
        assert_eq!(store.get("off").unwrap(), Some(SettingValue::Bool(false)));
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn floats_are_stored_without_precision_loss() {
        let mut store = SqliteStore::open_memory().unwrap();
        let value = SettingValue::List(vec![SettingValue::Float(519092290426.92084)]);
        store.update("ratios", &value).unwrap();
        store.update("ratio", &SettingValue::Float(0.1 + 0.2)).unwrap();
        assert_eq!(store.get("ratios").unwrap(), Some(value));
        assert_eq!(store.get("ratio").unwrap(), Some(SettingValue::Float(0.1 + 0.2)));
    }

    #[test]
    fn names_follow_insertion_order() {
        let mut store = SqliteStore::open_memory().unwrap();
        for name in ["zeta", "alpha", "mid"] {
            store.update(name, &SettingValue::Int(1)).unwrap();
        }
        assert_eq!(store.names().unwrap(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn autoload_flag_is_kept_by_update() {
        let mut store = SqliteStore::open_memory().unwrap();
        store.add("cron", &"x".into(), false).unwrap();
        store.update("cron", &"y".into()).unwrap();
        assert_eq!(store.autoload("cron").unwrap(), Some(false));
        assert_eq!(store.get("cron").unwrap(), Some("y".into()));

        store.update("new", &"z".into()).unwrap();
        assert_eq!(store.autoload("new").unwrap(), Some(true));
        assert_eq!(store.autoload("missing").unwrap(), None);
    }

    #[test]
    fn add_rejects_existing_and_delete_reports_presence() {
        let mut store = SqliteStore::open_memory().unwrap();
        store.add("a", &"1".into(), true).unwrap();
        assert!(matches!(
            store.add("a", &"2".into(), true),
            Err(StoreError::Rejected { .. })
        ));
        assert!(store.delete("a").unwrap());
        assert!(!store.delete("a").unwrap());
    }

    #[test]
    fn read_only_store_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.db");
        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.update("blogname", &"Acme".into()).unwrap();
        }
        let mut store = SqliteStore::open_read_only(&path).unwrap();
        assert_eq!(store.get("blogname").unwrap(), Some("Acme".into()));
        match store.update("blogname", &"Other".into()) {
            Err(StoreError::Rejected { name, .. }) => assert_eq!(name, "blogname"),
            other => panic!("expected rejection, got {other:?}"),
        }
    }
}
