//! Core domain types shared by the linkpost crates.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one publish run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// SourceRecord
// ---------------------------------------------------------------------------

/// One bookmark entry from the source feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Zero-based position in the fetched collection.
    pub index: usize,
    /// Display name (usually the page title).
    pub name: String,
    /// The link exactly as bookmarked, before traversal.
    pub link: String,
    /// Short description.
    #[serde(default)]
    pub description: String,
    /// Raw update timestamp as reported by the feed.
    #[serde(default)]
    pub updated_at: String,
    /// Tag names.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Remote thumbnail reference, if the feed has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Free-text body (HTML or Markdown).
    #[serde(default)]
    pub body: String,
    /// Content archetype for the generated document.
    #[serde(default)]
    pub archetype: String,
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

/// A fetched record collection, in feed order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Collection {
    /// Endpoint the collection was fetched from.
    pub endpoint: String,
    /// Collection name, if the feed reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Records; `items[i].index == i`.
    pub items: Vec<SourceRecord>,
}

impl Collection {
    /// Number of records in the collection.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the collection has no records.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
