//! Document model - per-document identity, text, selection and scroll state

mod document;
mod selection;

pub use document::{CachedState, Document, DocumentId};
pub use selection::Selection;
