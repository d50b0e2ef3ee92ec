use std::collections::HashMap;
use std::env;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use anyhow::Context;

use crate::error::{AppError, Result};
use crate::store::TableStore;

/// Name of the key/value config table.
pub const CONFIG_TABLE: &str = "HCIS_Config";

/// How long a loaded config map stays fresh.
const CONFIG_TTL: Duration = Duration::from_secs(300);

/// Keys the operator must fill in before OTP dispatch works.
pub const REQUIRED_KEYS: &[&str] = &[
    "SESSION_TTL_SECONDS",
    "STARSENDER_URL",
    "STARSENDER_APIKEY",
    "STARSENDER_MODE",
];

/// The application's bootstrap configuration, from the environment.
#[derive(Clone)]
pub struct Config {
    /// Path of the JSON document backing the table store.
    pub tables_path: String,
    /// Address the HTTP server binds to.
    pub bind_addr: String,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            tables_path: env::var("TABLES_PATH")
                .context("TABLES_PATH must be set (path of the JSON table document)")?,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string()),
        })
    }
}

struct CacheSlot {
    built_at: Instant,
    map: Arc<HashMap<String, String>>,
}

/// Read-only key/value lookup over the config table, cached briefly.
///
/// A missing config table reads as an empty map so lookups with defaults keep
/// working; `require` then surfaces the unfilled key with an operator hint.
#[derive(Clone)]
pub struct ConfigStore {
    store: Arc<dyn TableStore>,
    cache: Arc<RwLock<Option<CacheSlot>>>,
}

impl ConfigStore {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self {
            store,
            cache: Arc::new(RwLock::new(None)),
        }
    }

    fn load(&self) -> Result<Arc<HashMap<String, String>>> {
        {
            let cache = self.cache.read().expect("config lock poisoned");
            if let Some(slot) = cache.as_ref() {
                if slot.built_at.elapsed() < CONFIG_TTL {
                    return Ok(slot.map.clone());
                }
            }
        }

        let mut map = HashMap::new();
        match self.store.read_table(CONFIG_TABLE) {
            Ok(table) => {
                let c_key = table.column_index("Key").ok_or_else(|| {
                    AppError::Config(format!("Tabel {CONFIG_TABLE} wajib punya kolom \"Key\""))
                })?;
                let c_value = table.column_index("Value").ok_or_else(|| {
                    AppError::Config(format!("Tabel {CONFIG_TABLE} wajib punya kolom \"Value\""))
                })?;
                for row in &table.rows {
                    let key = row.get(c_key).map(|v| v.trim()).unwrap_or_default();
                    if key.is_empty() {
                        continue;
                    }
                    let value = row.get(c_value).map(|v| v.trim()).unwrap_or_default();
                    map.insert(key.to_string(), value.to_string());
                }
            }
            Err(AppError::TableNotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let map = Arc::new(map);
        let mut cache = self.cache.write().expect("config lock poisoned");
        *cache = Some(CacheSlot {
            built_at: Instant::now(),
            map: map.clone(),
        });
        Ok(map)
    }

    /// Raw lookup; `None` when the key is absent or blank.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let map = self.load()?;
        Ok(map.get(key).filter(|v| !v.is_empty()).cloned())
    }

    pub fn get_string(&self, key: &str, default: &str) -> Result<String> {
        Ok(self.get(key)?.unwrap_or_else(|| default.to_string()))
    }

    pub fn get_number(&self, key: &str, default: i64) -> Result<i64> {
        Ok(self
            .get(key)?
            .and_then(|v| v.parse().ok())
            .unwrap_or(default))
    }

    /// Required lookup; failure names the key and table for the operator.
    pub fn require(&self, key: &str) -> Result<String> {
        self.get(key)?
            .ok_or_else(|| AppError::Config(format!("{key} belum diisi di {CONFIG_TABLE}")))
    }

    /// Lists required keys that are still unfilled. Logged at startup.
    pub fn validate(&self) -> Result<Vec<String>> {
        let map = self.load()?;
        Ok(REQUIRED_KEYS
            .iter()
            .filter(|key| map.get(**key).map(|v| v.is_empty()).unwrap_or(true))
            .map(|key| key.to_string())
            .collect())
    }
}
