use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque unique identifier for a saved item.
///
/// Assigned by the store at creation and never reassigned; dedup updates
/// preserve the original id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One saved page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Store-assigned identifier.
    pub id: ItemId,
    /// Canonical absolute URL; natural key for dedup.
    pub url: String,
    /// Sanitized display title.
    pub title: String,
    /// Favicon location derived from the URL's host at save time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon_url: Option<String>,
    /// Save timestamp in epoch milliseconds. Ordering key only; not
    /// assumed monotonic across items.
    pub added_at: i64,
}

/// The complete set of saved items, persisted as a single blob.
///
/// Unordered on disk; every read-side view computes its own ordering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    /// All saved items, in insertion order.
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Collection {
    /// Number of items in the collection.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the collection holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn find_by_url_mut(&mut self, url: &str) -> Option<&mut Item> {
        self.items.iter_mut().find(|item| item.url == url)
    }

    pub(crate) fn contains_id(&self, id: &ItemId) -> bool {
        self.items.iter().any(|item| item.id == *id)
    }
}
