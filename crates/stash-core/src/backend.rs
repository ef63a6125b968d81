//! Persistence backend contract and the in-memory reference backend.
//!
//! A backend is an asynchronous key→blob store that may be slow, fail,
//! or be written concurrently from outside the process (another device
//! syncing the same account). It offers no transactions and may reorder
//! the visibility of concurrent writers; the store layers its own
//! invariants on top. Change notifications carry no payload beyond
//! "this key changed" — consumers invalidate and re-read, they never
//! consume data from the notification itself.

use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tokio::sync::{RwLock, broadcast};

/// Capacity of each per-key change channel.
///
/// A subscriber that falls further behind observes `Lagged`, which
/// consumers must treat as "changed at least once".
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Asynchronous key→blob persistence contract consumed by the store.
///
/// Acknowledgement of a `set` does not imply global visibility: other
/// readers of the same key learn of the change only through their own
/// change notifications and re-reads.
#[async_trait]
pub trait SyncBackend: Send + Sync {
    /// Fetch the blob stored under `key`, or `None` if the key has
    /// never been set.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the blob under `key` in full. There is no partial-update
    /// primitive.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Subscribe to change notifications for `key`.
    ///
    /// The returned receiver is the subscription handle; dropping it
    /// cancels the subscription. Notifications may be coalesced under
    /// load (receiver lag counts as "changed").
    fn watch(&self, key: &str) -> broadcast::Receiver<()>;
}

/// Per-key change fan-out shared by the in-process backends.
#[derive(Debug, Default)]
pub(crate) struct ChangeHub {
    channels: Mutex<HashMap<String, broadcast::Sender<()>>>,
}

impl ChangeHub {
    fn sender(&self, key: &str) -> broadcast::Sender<()> {
        let mut channels = self
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        channels
            .entry(key.to_string())
            .or_insert_with(|| broadcast::channel(CHANGE_CHANNEL_CAPACITY).0)
            .clone()
    }

    pub(crate) fn watch(&self, key: &str) -> broadcast::Receiver<()> {
        self.sender(key).subscribe()
    }

    pub(crate) fn notify(&self, key: &str) {
        // A send error just means nobody is watching this key.
        let _ = self.sender(key).send(());
    }
}

/// In-memory backend.
///
/// The reference implementation of [`SyncBackend`]: a `HashMap` behind a
/// `tokio` lock with in-process change fan-out. Useful as a test double
/// and for hosts that persist the collection themselves.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    values: RwLock<HashMap<String, String>>,
    changes: ChangeHub,
}

impl MemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SyncBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        self.changes.notify(key);
        Ok(())
    }

    fn watch(&self, key: &str) -> broadcast::Receiver<()> {
        self.changes.watch(key)
    }
}
