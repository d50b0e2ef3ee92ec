use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};
use crate::models::user::{UserColumns, UserRecord};
use crate::store::{Table, TableStore, is_true};

/// Name of the backing users table.
pub const USERS_TABLE: &str = "Users";

/// How long a built directory stays fresh.
pub const DIRECTORY_TTL: Duration = Duration::from_secs(30);

/// One built projection of the Users table, keyed by NIP.
#[derive(Debug)]
pub struct UserDirectory {
    pub cols: UserColumns,
    pub users: HashMap<String, UserRecord>,
}

impl UserDirectory {
    pub fn get(&self, nip: &str) -> Option<&UserRecord> {
        self.users.get(nip)
    }
}

/// Fixed one-way digest applied to stored and presented secrets before any
/// comparison. Both sides are trimmed first, matching how the sheet stores
/// them.
pub fn digest_secret(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.trim().as_bytes()))
}

struct CacheSlot {
    built_at: Instant,
    dir: Arc<UserDirectory>,
}

/// Read-through cache of the Users table.
///
/// Every mutator of the Users table must call [`Directory::invalidate`] after
/// writing; TTL expiry alone is not enough for correctness-sensitive reads.
#[derive(Clone)]
pub struct Directory {
    store: Arc<dyn TableStore>,
    ttl: Duration,
    cache: Arc<RwLock<Option<CacheSlot>>>,
}

impl Directory {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self::with_ttl(store, DIRECTORY_TTL)
    }

    pub fn with_ttl(store: Arc<dyn TableStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the cached directory, rebuilding it when stale or absent.
    pub fn load(&self) -> Result<Arc<UserDirectory>> {
        {
            let cache = self.cache.read().expect("directory lock poisoned");
            if let Some(slot) = cache.as_ref() {
                if slot.built_at.elapsed() < self.ttl {
                    return Ok(slot.dir.clone());
                }
            }
        }
        self.load_fresh()
    }

    /// Rebuilds from the backing table, bypassing the cache, and repopulates
    /// it. OTP attempt counting goes through here so it never acts on a stale
    /// snapshot.
    pub fn load_fresh(&self) -> Result<Arc<UserDirectory>> {
        let dir = Arc::new(self.build()?);
        let mut cache = self.cache.write().expect("directory lock poisoned");
        *cache = Some(CacheSlot {
            built_at: Instant::now(),
            dir: dir.clone(),
        });
        Ok(dir)
    }

    /// Drops the cached directory. Called by every Users mutator.
    pub fn invalidate(&self) {
        let mut cache = self.cache.write().expect("directory lock poisoned");
        *cache = None;
    }

    fn build(&self) -> Result<UserDirectory> {
        let table = self.store.read_table(USERS_TABLE)?;
        let cols = resolve_columns(&table)?;

        let mut users = HashMap::new();
        for (i, row) in table.rows.iter().enumerate() {
            let nip = cell(row, Some(cols.nip));
            if nip.is_empty() {
                continue;
            }
            let role = cell(row, cols.role);
            users.insert(nip, UserRecord {
                row_index: i,
                pass_hash: digest_secret(&cell(row, Some(cols.pin))),
                active: cols
                    .aktif
                    .map(|c| is_true(&cell(row, Some(c))))
                    .unwrap_or(true),
                nama: cell(row, cols.nama),
                role: if role.is_empty() {
                    "PTK".to_string()
                } else {
                    role
                },
                email: cell(row, cols.email),
                no_hp: cell(row, cols.no_hp),
                otp: cell(row, cols.otp),
                otp_expired_at: parse_timestamp(&cell(row, cols.otp_expired_at)),
                otp_attempt: cell(row, cols.otp_attempt).parse().unwrap_or(0),
            });
        }

        tracing::debug!("user directory built: {} users", users.len());
        Ok(UserDirectory { cols, users })
    }
}

fn resolve_columns(table: &Table) -> Result<UserColumns> {
    let required = |name: &str| {
        table.column_index(name).ok_or_else(|| {
            AppError::Config(format!("Tabel {USERS_TABLE} wajib punya kolom \"{name}\""))
        })
    };

    Ok(UserColumns {
        nip: required("NIP")?,
        pin: required("PIN")?,
        aktif: table.column_index("Aktif"),
        nama: table.column_index("Nama"),
        role: table.column_index("Role"),
        email: table.column_index("Email"),
        no_hp: table.column_index("No_HP"),
        otp: table.column_index("ResetPIN_OTP"),
        otp_expired_at: table.column_index("ResetPIN_ExpiredAt"),
        otp_attempt: table.column_index("OTP_Attempt"),
        last_changed_at: table.column_index("PIN_LastChangedAt"),
    })
}

fn cell(row: &[String], idx: Option<usize>) -> String {
    idx.and_then(|i| row.get(i))
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
