use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::config::{Config, ConfigStore};
use crate::directory::Directory;
use crate::error::{AppError, Result};
use crate::gateway::{OtpGateway, StarsenderGateway};
use crate::session::SessionStore;
use crate::store::TableStore;
use crate::store::jsonfile::JsonStore;

/// How long a request waits for the write lock before giving up.
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(30);

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The backing tabular store.
    pub store: Arc<dyn TableStore>,
    /// Cached projection of the Users table.
    pub directory: Directory,
    /// Token and claims stores.
    pub sessions: SessionStore,
    /// Read-only key/value config.
    pub config: ConfigStore,
    /// Out-of-band code delivery.
    pub gateway: Arc<dyn OtpGateway>,
    /// Single logical writer at a time: every read-modify-write sequence
    /// against a user row runs under this lock. A per-NIP lock key would cut
    /// contention but request volume does not warrant it.
    pub write_lock: Arc<Mutex<()>>,
    /// Bounded wait before lock acquisition turns into a busy error.
    pub lock_wait: Duration,
}

impl AppState {
    /// Builds production state over the JSON table document named by `config`.
    pub fn new(config: &Config) -> Result<Self> {
        let store: Arc<dyn TableStore> = Arc::new(JsonStore::new(&config.tables_path));
        let config_store = ConfigStore::new(store.clone());
        let gateway = Arc::new(StarsenderGateway::new(config_store.clone()));
        Self::assemble(store, config_store, gateway)
    }

    /// Assembles state from explicit collaborators. Tests inject an in-memory
    /// store and a fake gateway here.
    pub fn with_parts(store: Arc<dyn TableStore>, gateway: Arc<dyn OtpGateway>) -> Result<Self> {
        let config_store = ConfigStore::new(store.clone());
        Self::assemble(store, config_store, gateway)
    }

    fn assemble(
        store: Arc<dyn TableStore>,
        config: ConfigStore,
        gateway: Arc<dyn OtpGateway>,
    ) -> Result<Self> {
        let ttl_seconds = config.get_number("SESSION_TTL_SECONDS", 21_600)?.max(0) as u64;
        Ok(Self {
            directory: Directory::new(store.clone()),
            sessions: SessionStore::new(Duration::from_secs(ttl_seconds)),
            store,
            config,
            gateway,
            write_lock: Arc::new(Mutex::new(())),
            lock_wait: DEFAULT_LOCK_WAIT,
        })
    }

    /// Acquires the process write lock with a bounded wait; contention is
    /// surfaced as a busy error rather than blocking indefinitely.
    pub async fn acquire_write_lock(&self) -> Result<OwnedMutexGuard<()>> {
        tokio::time::timeout(self.lock_wait, self.write_lock.clone().lock_owned())
            .await
            .map_err(|_| AppError::Busy)
    }
}
