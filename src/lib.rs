//! Inkpad - live-preview markdown editing core
//!
//! This crate provides the decoration engine and surface-multiplexing logic
//! for a markdown notes editor: one physical render surface is shared across
//! many logical documents, each with exactly-restorable editing state, and a
//! syntax-driven decoration set keeps the live preview consistent with the
//! caret position.
//!
//! The crate is deliberately host-agnostic: window placement, persistence,
//! keyboard wiring and actual pixel output live in the host. The engine
//! communicates outward through [`bridge::HostMessage`] values and waits on
//! host-side asynchrony only through the bounded-wait bridge.

pub mod bridge;
pub mod config;
pub mod decor;
pub mod model;
pub mod mux;
pub mod overlay;
pub mod renderer;
pub mod syntax;
pub mod trace;
pub mod util;

// Re-export commonly used types
pub use bridge::{await_bounded, EventPump, HostCommand, HostMessage, PendingOp, WaitTimeout};
pub use config::EngineConfig;
pub use decor::{is_folded, Decoration, RenderMode};
pub use model::{CachedState, Document, DocumentId, Selection};
pub use mux::{Multiplexer, Snapshot, SnapshotImage, SnapshotPixels, SurfaceHost, SwitchQueue};
pub use renderer::Renderer;
