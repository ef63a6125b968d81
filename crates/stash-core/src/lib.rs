//! # stash-core
//!
//! Core functionality for stash - a personal save-for-later reading list
//! over an eventually-synchronized key-value store.
//!
//! This crate owns the canonical list of saved items: validation and
//! sanitization, identity assignment, dedup-by-URL, the item-count
//! ceiling, sorted and filtered views, and an in-process cache kept
//! coherent with an external, asynchronous persistence backend that may
//! fail, be slow, or be mutated concurrently from another device syncing
//! the same account.
//!
//! ## Architecture
//!
//! - **Store**: [`ItemStore`] is the sole arbiter of collection
//!   invariants; its public surface is `add`, `remove`, `list`,
//!   `search`, and `count`.
//! - **Backends**: the [`SyncBackend`] trait models the key→blob store;
//!   [`MemoryBackend`] and [`JsonFileBackend`] ship with the crate.
//! - **Sanitization**: URL, title, and favicon handling for everything
//!   that crosses the trust boundary into the collection.
//! - **Error Handling**: a small caller-oriented taxonomy, so UIs can
//!   distinguish "list is full" from "couldn't reach storage".
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use stash_core::{ItemStore, MemoryBackend, Result};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<()> {
//! let backend = Arc::new(MemoryBackend::new());
//! let store = ItemStore::new(backend);
//!
//! let saved = store.add("https://example.com/post", "A good read").await?;
//! println!("saved {} as {}", saved.url, saved.id);
//!
//! for item in store.search("good").await? {
//!     println!("{} ({})", item.title, item.url);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Consistency Model
//!
//! Mutations are serialized within one store instance; across instances
//! the last writer wins and convergence happens through backend change
//! notifications, never through shared caches. See [`store`] for the
//! full model.

/// Persistence backend contract and the in-memory backend
pub mod backend;
/// Store configuration and default limits
pub mod config;
/// Error types and result aliases
pub mod error;
/// URL validation, title sanitization, and favicon derivation
pub mod sanitize;
/// Filesystem-backed persistence
pub mod storage;
/// The item store and its consistency model
pub mod store;
/// Core data types and structures
pub mod types;

mod cache;

// Re-export commonly used types
pub use backend::{MemoryBackend, SyncBackend};
pub use config::{COLLECTION_KEY, MAX_ITEMS, MAX_TITLE_LEN, StoreConfig};
pub use error::{Error, Result};
pub use sanitize::{canonicalize_url, favicon_url, sanitize_title};
pub use storage::JsonFileBackend;
pub use store::ItemStore;
pub use types::{Collection, Item, ItemId};
