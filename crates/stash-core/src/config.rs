//! Store configuration.
//!
//! Hosts embedding the store usually run with the defaults; the knobs
//! exist for platforms with different sync quotas and for tests that
//! want a small cap. Configuration deserializes from TOML with every
//! field optional:
//!
//! ```toml
//! collection_key = "items"
//! max_items = 512
//! max_title_len = 255
//! ```

use crate::Result;
use serde::{Deserialize, Serialize};

/// Default ceiling on the number of saved items in a committed collection.
pub const MAX_ITEMS: usize = 512;

/// Default hard cap on title length, in code units.
pub const MAX_TITLE_LEN: usize = 255;

/// Default backend key the collection blob is persisted under.
pub const COLLECTION_KEY: &str = "items";

/// Tunables for an [`ItemStore`](crate::ItemStore) instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend key the collection blob lives under. One blob per
    /// account; there are no per-item keys.
    pub collection_key: String,

    /// Ceiling on the number of items in any committed collection state.
    /// A non-dedup insert against a full collection fails with
    /// [`Error::StorageFull`](crate::Error::StorageFull).
    pub max_items: usize,

    /// Hard cap on sanitized title length, in code units. Longer titles
    /// are truncated silently.
    pub max_title_len: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            collection_key: COLLECTION_KEY.to_string(),
            max_items: MAX_ITEMS,
            max_title_len: MAX_TITLE_LEN,
        }
    }
}

impl StoreConfig {
    /// Parse a configuration from a TOML document.
    ///
    /// Missing fields fall back to their defaults, so an empty document
    /// yields `StoreConfig::default()`.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}
