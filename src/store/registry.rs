//! Process-wide registry of named store handles.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use sqlx::sqlite::SqlitePool;
use tracing::debug;

use super::handle::{SharedStore, StoreHandle};

/// Reserved store name denoting an ephemeral, non-persisted store.
///
/// Ephemeral stores are never shared: every [`StoreRegistry::acquire`] of
/// this name yields an isolated instance.
pub const MEMORY: &str = ":memory:";

struct Entry {
    shared: Arc<SharedStore>,
    refs: usize,
}

/// Registry mapping a store name to a reference-counted shared store.
///
/// Cheap to clone; clones share the same underlying map. Most callers use
/// the process-wide default via [`StoreRegistry::global`], but the registry
/// is an ordinary value and can be injected for isolation (tests, embedded
/// use).
#[derive(Clone, Default)]
pub struct StoreRegistry {
    stores: Arc<Mutex<HashMap<String, Entry>>>,
}

impl StoreRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide default registry.
    #[must_use]
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<StoreRegistry> = OnceLock::new();
        GLOBAL.get_or_init(Self::new)
    }

    /// Acquire a handle for the named store.
    ///
    /// Returns immediately with a pending handle; the store is opened and
    /// schema-initialized on first use. Acquiring a name that is already
    /// registered increments its reference count and shares the existing
    /// connection. [`MEMORY`] bypasses the registry entirely.
    #[must_use]
    pub fn acquire(&self, name: &str) -> StoreHandle {
        if name == MEMORY {
            debug!("acquired ephemeral store handle");
            return StoreHandle::ephemeral(Arc::new(SharedStore::new(name)));
        }

        let mut stores = self.lock();
        if let Some(entry) = stores.get_mut(name) {
            entry.refs += 1;
            debug!("acquired store {name:?} (refs: {})", entry.refs);
            StoreHandle::registered(name, Arc::clone(&entry.shared), self.clone())
        } else {
            let shared = Arc::new(SharedStore::new(name));
            stores.insert(
                name.to_string(),
                Entry {
                    shared: Arc::clone(&shared),
                    refs: 1,
                },
            );
            debug!("acquired store {name:?} (refs: 1)");
            StoreHandle::registered(name, shared, self.clone())
        }
    }

    /// Drop one reference to the named store.
    ///
    /// When the count reaches zero the entry is removed, so a future
    /// [`StoreRegistry::acquire`] of the same name reopens cleanly, and the
    /// pool to close (if the open ever completed) is returned to the caller.
    pub(crate) fn release(&self, name: &str) -> Option<SqlitePool> {
        let mut stores = self.lock();
        let entry = stores.get_mut(name)?;
        entry.refs -= 1;
        if entry.refs > 0 {
            debug!("released store {name:?} (refs: {})", entry.refs);
            return None;
        }
        let entry = stores.remove(name)?;
        debug!("released store {name:?} (last reference)");
        entry.shared.opened_pool()
    }

    /// Current reference count for the named store (0 when absent).
    #[must_use]
    pub fn active(&self, name: &str) -> usize {
        self.lock().get(name).map_or(0, |entry| entry.refs)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.stores.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_shares_named_entry() {
        let registry = StoreRegistry::new();
        let first = registry.acquire("accounts.db");
        assert_eq!(registry.active("accounts.db"), 1);
        let second = registry.acquire("accounts.db");
        assert_eq!(registry.active("accounts.db"), 2);
        drop(first);
        assert_eq!(registry.active("accounts.db"), 1);
        drop(second);
        assert_eq!(registry.active("accounts.db"), 0);
    }

    #[test]
    fn test_memory_is_never_registered() {
        let registry = StoreRegistry::new();
        let handle = registry.acquire(MEMORY);
        assert_eq!(registry.active(MEMORY), 0);
        drop(handle);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let registry = StoreRegistry::new();
        let handle = registry.acquire("accounts.db");
        handle.close().await;
        assert_eq!(registry.active("accounts.db"), 0);
        handle.close().await;
        assert_eq!(registry.active("accounts.db"), 0);
    }

    #[tokio::test]
    async fn test_reacquire_after_release() {
        let registry = StoreRegistry::new();
        let first = registry.acquire("accounts.db");
        first.close().await;
        let second = registry.acquire("accounts.db");
        assert_eq!(registry.active("accounts.db"), 1);
        second.close().await;
    }

    #[tokio::test]
    async fn test_operations_after_close_fail() {
        let registry = StoreRegistry::new();
        let handle = registry.acquire(MEMORY);
        handle.close().await;
        assert!(handle.pool().await.is_err());
    }
}
