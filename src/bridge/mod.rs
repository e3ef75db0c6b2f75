//! Host bridge - message types and the bounded-wait primitive
//!
//! The engine never calls the host directly: outbound effects are
//! [`HostMessage`] values returned as data (token-style Elm effects), and
//! inbound control arrives as [`HostCommand`] values dispatched to the
//! renderer. Both serialize to the `{action/command, documentId, ...}` wire
//! shape the host speaks.

mod wait;

pub use wait::{await_bounded, Completion, EventPump, PendingOp, WaitTimeout};

use serde::{Deserialize, Serialize};

use crate::model::{CachedState, DocumentId};

/// Outbound message to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum HostMessage {
    /// Renderer startup complete; serialize/capture are now safe
    Ready,
    /// Debounced user-driven content change for the attached document
    #[serde(rename_all = "camelCase")]
    ContentChanged {
        document_id: DocumentId,
        content: String,
    },
    #[serde(rename_all = "camelCase")]
    RequestSave { document_id: DocumentId },
    Log { message: String },
    Error { message: String },
    #[serde(rename = "openURL")]
    OpenUrl { url: String },
}

/// Inbound command exposed by the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum HostCommand {
    #[serde(rename_all = "camelCase")]
    LoadDocument { document_id: DocumentId, text: String },
    GetContent,
    Serialize,
    Restore { state: CachedState },
    SetCursorPosition { offset: usize },
    SetScrollTop { pixels: f64 },
    PrepareForCapture,
    EndCapture,
    Focus,
    OpenSearch,
    OpenSearchWithReplace,
}

/// Synchronous reply to an inbound command
#[derive(Debug, Clone, PartialEq)]
pub enum CommandReply {
    None,
    Content(String),
    State(CachedState),
}
