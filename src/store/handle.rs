//! Store handles with deferred open.
//!
//! Opening a store (connecting plus applying the schema script) happens
//! lazily on first use. A handle therefore has two states, "opening" and
//! "ready", and every operation resolves the pending open before issuing
//! queries. The first open failure is cached: subsequent operations on the
//! same handle fail fast instead of retrying.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tokio::sync::OnceCell;
use tracing::{debug, error, warn};

use super::registry::{MEMORY, StoreRegistry};
use crate::error::{StoreError, StoreResult};

/// Schema-initialization script, applied verbatim once per newly opened
/// store.
const INIT_DB_SQL: &str = include_str!("../../sql/init_db.sql");

/// Maximum pool connections for a named (file-backed) store.
const MAX_CONNECTIONS: u32 = 5;

/// One underlying store connection, shared by every handle acquired for the
/// same name.
pub(crate) struct SharedStore {
    name: String,
    pool: OnceCell<Result<SqlitePool, StoreError>>,
}

impl SharedStore {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            pool: OnceCell::new(),
        }
    }

    /// Resolve the pending open. Concurrent callers await the same in-flight
    /// attempt; the outcome is cached either way.
    pub(crate) async fn pool(&self) -> StoreResult<&SqlitePool> {
        self.pool
            .get_or_init(|| self.open())
            .await
            .as_ref()
            .map_err(Clone::clone)
    }

    /// The pool, if the open has already completed successfully.
    pub(crate) fn opened_pool(&self) -> Option<SqlitePool> {
        self.pool.get().and_then(|r| r.as_ref().ok().cloned())
    }

    async fn open(&self) -> Result<SqlitePool, StoreError> {
        // One connection for :memory: - every sqlite connection gets its own
        // in-memory database, so a larger pool would split the data.
        let (url, max_connections) = if self.name == MEMORY {
            ("sqlite::memory:".to_string(), 1)
        } else {
            (format!("sqlite:{}?mode=rwc", self.name), MAX_CONNECTIONS)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&url)
            .await
            .map_err(|e| {
                error!("failed to open account store {:?}: {e}", self.name);
                StoreError::Unavailable
            })?;

        if let Err(e) = sqlx::raw_sql(INIT_DB_SQL).execute(&pool).await {
            error!("failed to initialize account store {:?}: {e}", self.name);
            pool.close().await;
            return Err(StoreError::Unavailable);
        }

        debug!("opened account store {:?}", self.name);
        Ok(pool)
    }
}

/// A live reference to an opened (or still opening) store.
///
/// Named handles are reference-counted by the [`StoreRegistry`]; the
/// ephemeral `:memory:` store is never shared, so its handles own their
/// connection outright. Prefer [`StoreHandle::close`] for teardown; dropping
/// a handle still releases its registry reference, but skips the graceful
/// pool shutdown (sqlite's WAL checkpoint is then deferred to connection
/// drop).
///
/// ```no_run
/// # async fn demo() {
/// use userledger::StoreRegistry;
///
/// let handle = StoreRegistry::global().acquire("accounts.db");
/// // ... issue queries through a repository holding the handle ...
/// handle.close().await;
/// # }
/// ```
pub struct StoreHandle {
    name: String,
    shared: Arc<SharedStore>,
    registry: Option<StoreRegistry>,
    released: AtomicBool,
}

impl StoreHandle {
    /// Handle for an unshared ephemeral store.
    pub(crate) fn ephemeral(shared: Arc<SharedStore>) -> Self {
        Self {
            name: MEMORY.to_string(),
            shared,
            registry: None,
            released: AtomicBool::new(false),
        }
    }

    /// Handle for a named store tracked by `registry`.
    pub(crate) fn registered(name: &str, shared: Arc<SharedStore>, registry: StoreRegistry) -> Self {
        Self {
            name: name.to_string(),
            shared,
            registry: Some(registry),
            released: AtomicBool::new(false),
        }
    }

    /// Await the pending open and return the ready connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the store failed to open or
    /// this handle has already been closed.
    pub(crate) async fn pool(&self) -> StoreResult<&SqlitePool> {
        if self.released.load(Ordering::Acquire) {
            warn!("operation attempted on closed store handle {:?}", self.name);
            return Err(StoreError::Unavailable);
        }
        self.shared.pool().await
    }

    /// Release this handle.
    ///
    /// For ephemeral handles the connection is closed immediately. For named
    /// handles the registry reference count is decremented and the
    /// underlying pool is closed once it reaches zero. Closing an
    /// already-closed handle is a no-op.
    pub async fn close(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        let pool = match &self.registry {
            None => self.shared.opened_pool(),
            Some(registry) => registry.release(&self.name),
        };
        if let Some(pool) = pool {
            pool.close().await;
            debug!("closed account store {:?}", self.name);
        }
    }
}

impl Drop for StoreHandle {
    fn drop(&mut self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(registry) = &self.registry {
            // If this was the last referent the returned pool clone is
            // dropped rather than closed; its connections shut down when the
            // last clone goes away.
            drop(registry.release(&self.name));
        }
    }
}
