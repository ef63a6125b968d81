//! In-process mirror of the last-known collection.
//!
//! Owned exclusively by one store instance and never shared by
//! reference. The cache moves through `Cold` → `Populating` → `Warm`
//! and back to `Cold` on invalidation. An epoch counter ties each
//! populate to the invalidation state it started under, so a read that
//! raced an invalidation can never install a stale collection:
//! invalidation bumps the epoch, and a populate only commits if the
//! epoch it observed is still current. Invalidation is idempotent.

use crate::types::Collection;
use tokio::sync::Mutex;

#[derive(Debug)]
enum CacheState {
    /// No cached collection; the next read must hit the backend.
    Cold,
    /// A backend read is in flight for this cache.
    Populating,
    /// The cached collection is current as of the last populate.
    Warm(Collection),
}

#[derive(Debug)]
struct CacheInner {
    state: CacheState,
    epoch: u64,
}

/// Outcome of [`CollectionCache::begin_read`].
pub(crate) enum ReadPhase {
    /// The cache was warm; use this snapshot.
    Hit(Collection),
    /// The cache was cold; the caller must fetch from the backend and
    /// then call `complete_read` or `abort_read` with this epoch.
    Miss { epoch: u64 },
}

pub(crate) struct CollectionCache {
    inner: Mutex<CacheInner>,
}

impl CollectionCache {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                state: CacheState::Cold,
                epoch: 0,
            }),
        }
    }

    /// Start a read. Returns a snapshot on a warm cache, otherwise
    /// marks the cache populating and hands back the current epoch.
    pub(crate) async fn begin_read(&self) -> ReadPhase {
        let mut inner = self.inner.lock().await;
        if let CacheState::Warm(ref collection) = inner.state {
            return ReadPhase::Hit(collection.clone());
        }
        inner.state = CacheState::Populating;
        ReadPhase::Miss { epoch: inner.epoch }
    }

    /// Install a fetched collection, unless an invalidation arrived
    /// after the read began. Returns whether the cache warmed up.
    pub(crate) async fn complete_read(&self, epoch: u64, collection: &Collection) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.epoch == epoch {
            inner.state = CacheState::Warm(collection.clone());
            true
        } else {
            false
        }
    }

    /// Roll back a failed populate. A failed backend read leaves the
    /// cache cold; there is no error terminal state.
    pub(crate) async fn abort_read(&self, epoch: u64) {
        let mut inner = self.inner.lock().await;
        if inner.epoch == epoch && matches!(inner.state, CacheState::Populating) {
            inner.state = CacheState::Cold;
        }
    }

    /// Drop any cached collection and bump the epoch so in-flight
    /// populates cannot commit. Safe to call redundantly.
    pub(crate) async fn invalidate(&self) {
        let mut inner = self.inner.lock().await;
        inner.state = CacheState::Cold;
        inner.epoch = inner.epoch.wrapping_add(1);
    }

    #[cfg(test)]
    async fn is_warm(&self) -> bool {
        matches!(self.inner.lock().await.state, CacheState::Warm(_))
    }
}
