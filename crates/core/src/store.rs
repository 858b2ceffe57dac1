//! Sqlite-backed key/value store for bound settings.
//!
//! One row per bound setting name. Scalars are stored as plain strings,
//! list values as JSON arrays. Unknown rows are ignored on load, missing
//! rows fall back to the default captured at bind time, and every failure
//! is soft: the plugin keeps running on in-memory values.

use anyhow::Context;
use parking_lot::{Mutex, RwLock};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::setting::{ListSetting, Setting};
use crate::log_warn;

const SCHEMA_VERSION: i32 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open settings database at {path}: {source}")]
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },
    #[error("settings database error: {0}")]
    Sql(#[from] rusqlite::Error),
}

/// One registered storage location.
enum Bound {
    F32(Arc<Setting<f32>>),
    I32(Arc<Setting<i32>>),
    Bool(Arc<Setting<bool>>),
    List(Arc<ListSetting>),
}

struct Binding {
    key: &'static str,
    bound: Bound,
}

impl Binding {
    fn encode(&self) -> String {
        match &self.bound {
            Bound::F32(s) => s.get().to_string(),
            Bound::I32(s) => s.get().to_string(),
            Bound::Bool(s) => s.get().to_string(),
            Bound::List(s) => {
                serde_json::to_string(&s.get()).unwrap_or_else(|_| "[]".to_string())
            }
        }
    }

    fn decode(&self, raw: &str) {
        match &self.bound {
            Bound::F32(s) => match raw.parse::<f32>() {
                Ok(v) => s.set(v),
                Err(_) => log_warn!("Ignoring malformed value for {}: {:?}", self.key, raw),
            },
            Bound::I32(s) => match raw.parse::<i32>() {
                Ok(v) => s.set(v),
                Err(_) => log_warn!("Ignoring malformed value for {}: {:?}", self.key, raw),
            },
            Bound::Bool(s) => match raw {
                "true" => s.set(true),
                "false" => s.set(false),
                _ => log_warn!("Ignoring malformed value for {}: {:?}", self.key, raw),
            },
            Bound::List(s) => match serde_json::from_str::<Vec<String>>(raw) {
                Ok(v) => s.set(v),
                Err(_) => log_warn!("Ignoring malformed list for {}: {:?}", self.key, raw),
            },
        }
    }
}

/// Ordered binding registry plus the connection used for every read and
/// write. The connection mutex is the single write-exclusion lock named in
/// the concurrency model; it is held only for the duration of a `load` or
/// `save` call.
pub struct ConfigStore {
    conn: Mutex<Connection>,
    bindings: RwLock<Vec<Binding>>,
}

impl ConfigStore {
    /// Plugin data directory, `%APPDATA%\Lumenshift`.
    pub fn default_data_dir() -> anyhow::Result<PathBuf> {
        let app_data = std::env::var("APPDATA")
            .context("Failed to get APPDATA environment variable")?;
        Ok(PathBuf::from(app_data).join("Lumenshift"))
    }

    pub fn default_path() -> anyhow::Result<PathBuf> {
        Ok(Self::default_data_dir()?.join("settings.db"))
    }

    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::init_database(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            bindings: RwLock::new(Vec::new()),
        })
    }

    fn init_database(conn: &Connection) -> Result<(), StoreError> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        let current_version: Option<i32> = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .ok();

        if current_version.is_none() {
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )?;
        }

        Ok(())
    }

    pub fn bind_f32(&self, setting: Arc<Setting<f32>>) {
        self.bindings.write().push(Binding {
            key: setting.name(),
            bound: Bound::F32(setting),
        });
    }

    pub fn bind_i32(&self, setting: Arc<Setting<i32>>) {
        self.bindings.write().push(Binding {
            key: setting.name(),
            bound: Bound::I32(setting),
        });
    }

    pub fn bind_bool(&self, setting: Arc<Setting<bool>>) {
        self.bindings.write().push(Binding {
            key: setting.name(),
            bound: Bound::Bool(setting),
        });
    }

    pub fn bind_list(&self, setting: Arc<ListSetting>) {
        self.bindings.write().push(Binding {
            key: setting.name(),
            bound: Bound::List(setting),
        });
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.read().len()
    }

    /// Re-read every bound setting. Missing rows keep the value the setting
    /// already holds (its bind-time default); rows for keys nothing bound
    /// are ignored.
    pub fn load(&self) {
        let conn = self.conn.lock();
        let bindings = self.bindings.read();

        for binding in bindings.iter() {
            let raw: Option<String> = conn
                .query_row(
                    "SELECT value FROM settings WHERE key = ?1",
                    params![binding.key],
                    |row| row.get(0),
                )
                .ok();

            if let Some(raw) = raw {
                binding.decode(&raw);
            }
        }
    }

    /// Serialize every binding's current value. Serialized against
    /// concurrent saves by the connection mutex.
    pub fn save(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let bindings = self.bindings.read();

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        for binding in bindings.iter() {
            conn.execute(
                "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)",
                params![binding.key, binding.encode(), now],
            )?;
        }

        Ok(())
    }

    /// Raw row access, for diagnostics and tests.
    pub fn read_raw(&self, key: &str) -> Option<String> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .ok()
    }

    /// Write a row nothing is bound to. Loads must skip it.
    #[cfg(test)]
    pub fn write_raw(&self, key: &str, value: &str) {
        let conn = self.conn.lock();
        let _ = conn.execute(
            "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?1, ?2, 0)",
            params![key, value],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(name: &str) -> ConfigStore {
        let nonce = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0);
        let path = std::env::temp_dir().join(format!(
            "lumenshift_store_{}_{}_{}.db",
            name,
            std::process::id(),
            nonce
        ));
        ConfigStore::open(&path).unwrap()
    }

    #[test]
    fn save_then_load_round_trips_scalars_and_lists() {
        let store = temp_store("round_trip");

        let brightness = Arc::new(Setting::new("PeakBrightness", 1000i32));
        let strength = Arc::new(Setting::new("Bloom", 50.0f32));
        let sharpen = Arc::new(Setting::new("PostSharpen", true));
        let targets = Arc::new(ListSetting::new("UpgradeTargets", &["SceneColor"]));

        store.bind_i32(brightness.clone());
        store.bind_f32(strength.clone());
        store.bind_bool(sharpen.clone());
        store.bind_list(targets.clone());

        brightness.set(650);
        strength.set(75.0);
        sharpen.set(false);
        targets.set(vec!["BloomChain".into(), "SceneColor".into()]);
        store.save().unwrap();

        // Clobber in-memory values, then load them back.
        brightness.set(0);
        strength.set(0.0);
        sharpen.set(true);
        targets.set(vec![]);
        store.load();

        assert_eq!(brightness.get(), 650);
        assert_eq!(strength.get(), 75.0);
        assert!(!sharpen.get());
        assert_eq!(targets.get(), vec!["BloomChain", "SceneColor"]);
    }

    #[test]
    fn missing_rows_keep_defaults() {
        let store = temp_store("missing");
        let mode = Arc::new(Setting::new("DisplayMode", 1i32));
        store.bind_i32(mode.clone());

        store.load();
        assert_eq!(mode.get(), 1);
    }

    #[test]
    fn unknown_and_malformed_rows_are_ignored() {
        let store = temp_store("unknown");
        let mode = Arc::new(Setting::new("DisplayMode", 0i32));
        store.bind_i32(mode.clone());

        store.write_raw("RetiredSetting", "whatever");
        store.write_raw("DisplayMode", "not-a-number");
        store.load();

        assert_eq!(mode.get(), 0);
    }

    #[test]
    fn list_order_survives_persistence() {
        let store = temp_store("order");
        let targets = Arc::new(ListSetting::new("UpgradeTargets", &[]));
        store.bind_list(targets.clone());

        let names = vec![
            "SceneColor".to_string(),
            "PostProcessColor".to_string(),
            "BloomChain".to_string(),
            "TAAHistory".to_string(),
        ];
        targets.set(names.clone());
        store.save().unwrap();
        targets.set(vec![]);
        store.load();

        assert_eq!(targets.get(), names);
    }
}
