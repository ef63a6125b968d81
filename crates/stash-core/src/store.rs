//! The item store: sole arbiter of collection invariants.
//!
//! All reads and writes of saved items pass through [`ItemStore`]. It
//! owns validation, identity assignment, dedup-by-URL, the item-count
//! ceiling, sorted/filtered views, and a read-through cache that is
//! invalidated whenever the backend reports a change to the collection
//! key — from this instance or any other writer of the same account.
//!
//! ## Concurrency
//!
//! Mutations are serialized per instance: `add` and `remove` hold an
//! async gate across their read-modify-write so concurrent callers on
//! one store produce a serial order, each performing its own backend
//! round trip. Across instances there is no such gate and no
//! compare-and-swap at the backend boundary; concurrent writers race
//! and the last write wins. Instances converge through change
//! notifications and re-reads, never through direct cache-to-cache
//! communication.
//!
//! Operations never retry internally and cannot be cancelled mid-flight;
//! a backend failure surfaces immediately to the caller of that one
//! operation and leaves the cache cold.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, warn};

use crate::backend::SyncBackend;
use crate::cache::{CollectionCache, ReadPhase};
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::sanitize::{canonicalize_url, favicon_url, sanitize_title};
use crate::types::{Collection, Item, ItemId};

/// A save-for-later item store over an asynchronous persistence backend.
///
/// The public surface is exactly `add`, `remove`, `list`, `search`, and
/// `count`; UI state (loading flags, debounce timers) lives entirely
/// outside the core. Multiple stores may share one backend via `Arc`,
/// each with an independent private cache.
pub struct ItemStore<B: SyncBackend> {
    backend: Arc<B>,
    config: StoreConfig,
    cache: CollectionCache,
    /// Subscription to backend change notifications for the collection
    /// key; dropped (and thereby cancelled) with the store.
    changes: Mutex<broadcast::Receiver<()>>,
    /// Serializes read-modify-write cycles within this instance.
    write_gate: Mutex<()>,
}

impl<B: SyncBackend> ItemStore<B> {
    /// Creates a store with the default configuration.
    #[must_use]
    pub fn new(backend: Arc<B>) -> Self {
        Self::with_config(backend, StoreConfig::default())
    }

    /// Creates a store with an explicit configuration.
    #[must_use]
    pub fn with_config(backend: Arc<B>, config: StoreConfig) -> Self {
        let changes = Mutex::new(backend.watch(&config.collection_key));
        Self {
            backend,
            config,
            cache: CollectionCache::new(),
            changes,
            write_gate: Mutex::new(()),
        }
    }

    /// The configuration this store was created with.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Save a page, or refresh it if the URL is already saved.
    ///
    /// The URL must be an absolute `http`/`https` URL; the title is
    /// sanitized and silently truncated. Saving an already-saved URL
    /// updates the existing item in place — title replaced, timestamp
    /// refreshed, id preserved — so revisited pages surface at the top
    /// of recency-ordered views. A new URL against a full collection
    /// fails with [`Error::StorageFull`] without mutating anything.
    pub async fn add(&self, url: &str, title: &str) -> Result<Item> {
        let parsed = canonicalize_url(url)?;
        let favicon = favicon_url(&parsed);
        let canonical = String::from(parsed);
        let title = sanitize_title(title, self.config.max_title_len);

        self.drain_notifications().await;
        let _gate = self.write_gate.lock().await;

        // Mutations always re-read the backend; the cache is a read-side
        // convenience and never feeds a write.
        let mut collection = self.fetch_collection().await?;
        let now = Utc::now().timestamp_millis();

        let item = if let Some(existing) = collection.find_by_url_mut(&canonical) {
            existing.title = title;
            existing.added_at = now;
            let refreshed = existing.clone();
            debug!(id = %refreshed.id, url = %refreshed.url, "refreshed saved item");
            refreshed
        } else {
            if collection.len() >= self.config.max_items {
                warn!(
                    limit = self.config.max_items,
                    "collection full; rejecting new item"
                );
                return Err(Error::StorageFull {
                    limit: self.config.max_items,
                });
            }
            let item = Item {
                id: ItemId::generate(),
                url: canonical,
                title,
                favicon_url: favicon,
                added_at: now,
            };
            collection.items.push(item.clone());
            debug!(id = %item.id, url = %item.url, total = collection.len(), "saved new item");
            item
        };

        self.persist_collection(&collection).await?;
        self.cache.invalidate().await;
        Ok(item)
    }

    /// Remove a saved item by id.
    ///
    /// Removing an absent id is a no-op success, not an error — the
    /// common failure mode is deleting the same item twice from two UI
    /// surfaces. A no-op remove skips the redundant write-back.
    pub async fn remove(&self, id: &ItemId) -> Result<()> {
        self.drain_notifications().await;
        let _gate = self.write_gate.lock().await;

        let mut collection = self.fetch_collection().await?;
        if !collection.contains_id(id) {
            debug!(%id, "remove of absent id; nothing to do");
            return Ok(());
        }

        collection.items.retain(|item| item.id != *id);
        self.persist_collection(&collection).await?;
        self.cache.invalidate().await;
        debug!(%id, remaining = collection.len(), "removed item");
        Ok(())
    }

    /// All saved items, most recently added first.
    ///
    /// Ties on the timestamp keep their relative collection order. An
    /// empty collection yields an empty sequence.
    pub async fn list(&self) -> Result<Vec<Item>> {
        let collection = self.read_through_cache().await?;
        Ok(sorted_by_recency(collection.items))
    }

    /// Saved items matching `query`, most recently added first.
    ///
    /// Matching is a case-insensitive literal substring test against
    /// both title and URL; query characters are never interpreted as a
    /// pattern language.
    pub async fn search(&self, query: &str) -> Result<Vec<Item>> {
        let items = self.list().await?;
        // An empty query is defined as the full list, not an empty result.
        if query.is_empty() {
            return Ok(items);
        }

        let needle = query.to_lowercase();
        Ok(items
            .into_iter()
            .filter(|item| {
                item.title.to_lowercase().contains(&needle)
                    || item.url.to_lowercase().contains(&needle)
            })
            .collect())
    }

    /// Number of saved items. Always equals `list().len()` at the same
    /// instant, without materializing the sorted view.
    pub async fn count(&self) -> Result<usize> {
        Ok(self.read_through_cache().await?.len())
    }

    /// Apply any pending backend change notifications.
    ///
    /// Runs at the start of every operation, so the cache can never
    /// satisfy a read after the backend told us the key changed.
    /// Invalidation is idempotent and lag counts as "changed".
    async fn drain_notifications(&self) {
        let mut rx = self.changes.lock().await;
        loop {
            match rx.try_recv() {
                Ok(()) => self.cache.invalidate().await,
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "change notifications lagged; invalidating cache");
                    self.cache.invalidate().await;
                },
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }

    async fn read_through_cache(&self) -> Result<Collection> {
        self.drain_notifications().await;
        match self.cache.begin_read().await {
            ReadPhase::Hit(collection) => Ok(collection),
            ReadPhase::Miss { epoch } => {
                let collection = match self.fetch_collection().await {
                    Ok(collection) => collection,
                    Err(e) => {
                        self.cache.abort_read(epoch).await;
                        return Err(e);
                    },
                };
                // A change reported while the read was in flight keeps
                // the cache cold; the fetched data still answers this
                // caller.
                self.drain_notifications().await;
                if self.cache.complete_read(epoch, &collection).await {
                    debug!(items = collection.len(), "cache populated");
                }
                Ok(collection)
            },
        }
    }

    async fn fetch_collection(&self) -> Result<Collection> {
        match self.backend.get(&self.config.collection_key).await? {
            None => Ok(Collection::default()),
            Some(blob) => serde_json::from_str(&blob)
                .map_err(|e| Error::Serialization(format!("collection blob is corrupt: {e}"))),
        }
    }

    async fn persist_collection(&self, collection: &Collection) -> Result<()> {
        let blob = serde_json::to_string(collection)?;
        self.backend.set(&self.config.collection_key, &blob).await
    }
}

/// Stable recency ordering: newest first, equal timestamps keep their
/// relative collection order.
fn sorted_by_recency(mut items: Vec<Item>) -> Vec<Item> {
    items.sort_by_key(|item| std::cmp::Reverse(item.added_at));
    items
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    fn store() -> ItemStore<MemoryBackend> {
        ItemStore::new(Arc::new(MemoryBackend::new()))
    }

    fn seed_item(id: &str, url: &str, title: &str, added_at: i64) -> Item {
        Item {
            id: ItemId::from(id),
            url: url.to_string(),
            title: title.to_string(),
            favicon_url: None,
            added_at,
        }
    }

    async fn seed(backend: &MemoryBackend, items: Vec<Item>) {
        let blob = serde_json::to_string(&Collection { items }).unwrap();
        backend.set("items", &blob).await.unwrap();
    }

    #[tokio::test]
    async fn add_assigns_id_and_derives_favicon() {
        let store = store();
        let item = store.add("https://example.com/a", "A").await.unwrap();

        assert!(!item.id.as_str().is_empty());
        assert_eq!(item.url, "https://example.com/a");
        assert_eq!(item.title, "A");
        assert_eq!(
            item.favicon_url.as_deref(),
            Some("https://example.com/favicon.ico")
        );
    }

    #[tokio::test]
    async fn add_dedups_by_url_preserving_id() {
        let store = store();
        let first = store.add("https://example.com/a", "t1").await.unwrap();
        let second = store.add("https://example.com/a", "t2").await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.title, "t2");
        assert!(second.added_at >= first.added_at);

        let items = store.list().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "t2");
    }

    #[tokio::test]
    async fn add_rejects_invalid_urls_without_mutating() {
        let store = store();
        store.add("https://example.com/ok", "ok").await.unwrap();

        for raw in ["javascript:alert(1)", "not-a-url"] {
            let err = store.add(raw, "x").await.unwrap_err();
            assert!(matches!(err, Error::InvalidUrl(_)), "for input {raw}");
        }

        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn add_truncates_over_long_titles() {
        let store = store();
        let long = "a".repeat(300);
        let item = store.add("https://example.com/a", &long).await.unwrap();

        assert_eq!(item.title.chars().count(), 255);
        assert_eq!(item.title, long[..255]);
    }

    #[tokio::test]
    async fn add_enforces_the_item_cap() {
        let config = StoreConfig {
            max_items: 3,
            ..StoreConfig::default()
        };
        let store = ItemStore::with_config(Arc::new(MemoryBackend::new()), config);

        for i in 0..3 {
            store
                .add(&format!("https://example.com/{i}"), "t")
                .await
                .unwrap();
        }

        let err = store.add("https://example.com/new", "t").await.unwrap_err();
        assert!(matches!(err, Error::StorageFull { limit: 3 }));
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn dedup_update_succeeds_against_a_full_collection() {
        let config = StoreConfig {
            max_items: 2,
            ..StoreConfig::default()
        };
        let store = ItemStore::with_config(Arc::new(MemoryBackend::new()), config);

        store.add("https://example.com/a", "a").await.unwrap();
        store.add("https://example.com/b", "b").await.unwrap();

        let refreshed = store.add("https://example.com/a", "a2").await.unwrap();
        assert_eq!(refreshed.title, "a2");
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let store = store();
        let item = store.add("https://example.com/a", "A").await.unwrap();

        store.remove(&item.id).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);

        // Second delete of the same id is a no-op success.
        store.remove(&item.id).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn list_is_sorted_by_recency_descending() {
        let backend = Arc::new(MemoryBackend::new());
        seed(
            &backend,
            vec![
                seed_item("1", "https://example.com/1", "oldest", 1_000),
                seed_item("2", "https://example.com/2", "newest", 3_000),
                seed_item("3", "https://example.com/3", "middle", 2_000),
            ],
        )
        .await;

        let store = ItemStore::new(backend);
        let titles: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.title)
            .collect();
        assert_eq!(titles, ["newest", "middle", "oldest"]);
    }

    #[tokio::test]
    async fn equal_timestamps_keep_collection_order() {
        let backend = Arc::new(MemoryBackend::new());
        seed(
            &backend,
            vec![
                seed_item("1", "https://example.com/1", "first", 2_000),
                seed_item("2", "https://example.com/2", "second", 2_000),
                seed_item("3", "https://example.com/3", "third", 2_000),
            ],
        )
        .await;

        let store = ItemStore::new(backend);
        let titles: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.title)
            .collect();
        assert_eq!(titles, ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn empty_query_returns_the_full_list() {
        let store = store();
        store.add("https://example.com/a", "A").await.unwrap();
        store.add("https://example.com/b", "B").await.unwrap();

        let all = store.list().await.unwrap();
        let searched = store.search("").await.unwrap();
        assert_eq!(searched, all);
    }

    #[tokio::test]
    async fn search_matches_title_and_url_case_insensitively() {
        let store = store();
        store
            .add("https://tutorials.test/js", "JavaScript Tutorial")
            .await
            .unwrap();

        for query in ["JAVASCRIPT", "script", "TUTORIALS.TEST"] {
            let hits = store.search(query).await.unwrap();
            assert_eq!(hits.len(), 1, "query {query} should match");
        }

        assert!(store.search("zzz").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_treats_queries_as_literal_substrings() {
        let store = store();
        store
            .add("https://example.com/re", "Regex .* Guide")
            .await
            .unwrap();

        assert_eq!(store.search(".*").await.unwrap().len(), 1);
        assert!(store.search("[a-z]").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn count_tracks_list_length() {
        let store = store();
        assert_eq!(store.count().await.unwrap(), 0);

        store.add("https://example.com/a", "A").await.unwrap();
        store.add("https://example.com/b", "B").await.unwrap();

        assert_eq!(store.count().await.unwrap(), store.list().await.unwrap().len());
    }

    #[tokio::test]
    async fn full_save_refresh_remove_scenario() {
        let store = store();

        let saved = store.add("https://example.com/a", "A").await.unwrap();
        let items = store.list().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://example.com/a");
        assert_eq!(items[0].title, "A");

        store.add("https://example.com/a", "A2").await.unwrap();
        let items = store.list().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "A2");

        store.remove(&saved.id).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_blob_surfaces_as_serialization_error() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set("items", "definitely not json").await.unwrap();

        let store = ItemStore::new(backend);
        let err = store.list().await.unwrap_err();
        assert_eq!(err.category(), "serialization");
    }

    #[tokio::test]
    async fn sanitizes_titles_on_the_way_in() {
        let store = store();
        let item = store
            .add("https://example.com/a", "  <b>Hello</b> world ")
            .await
            .unwrap();
        assert_eq!(item.title, "Hello world");
    }
}
