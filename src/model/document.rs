//! Document records and cached editing state.
//!
//! A [`Document`] is the externally-owned description of one logical note:
//! the persisted store creates and deletes them, the engine only ever holds
//! the currently active one live inside the renderer. [`CachedState`] is the
//! engine's own serialization of a document's editing state, captured every
//! time the renderer switches away; once populated it supersedes the raw
//! document content for restore purposes.

use serde::{Deserialize, Serialize};

/// Unique identifier for a logical document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub u64);

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "doc-{}", self.0)
    }
}

/// Externally-owned document record: text plus last-known editing state.
///
/// Selection endpoints are byte offsets; `scroll_top` is in surface pixels.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: DocumentId,
    pub text: String,
    pub selection_anchor: usize,
    pub selection_head: usize,
    pub scroll_top: f64,
}

impl Document {
    /// Create a document with initial text and collapsed selection at 0
    pub fn new(id: DocumentId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            selection_anchor: 0,
            selection_head: 0,
            scroll_top: 0.0,
        }
    }
}

/// Serialized editing state for one document, as captured from the live
/// renderer. Round-trips through the host's persisted store unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedState {
    pub text: String,
    pub selection_anchor: usize,
    pub selection_head: usize,
    pub scroll_top: f64,
}

impl CachedState {
    /// Build a cached state directly from a document record (used when a
    /// document has never been attached and has no live serialization yet)
    pub fn from_document(doc: &Document) -> Self {
        Self {
            text: doc.text.clone(),
            selection_anchor: doc.selection_anchor,
            selection_head: doc.selection_head,
            scroll_top: doc.scroll_top,
        }
    }
}
