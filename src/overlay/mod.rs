//! Overlay layout and navigation
//!
//! Block-level widgets (block math, horizontal rules) must not disturb
//! click/caret coordinate mapping, so instead of replacing text they are
//! absolutely positioned over height-reconciled, visually-hidden source
//! lines. This module owns that geometry plus the caret motion that treats
//! a rendered block as a single atomic unit.

mod layout;
mod navigation;

pub use layout::{OverlayBlock, OverlayKind, OverlayLayout, WidgetMeasure};
pub use navigation::{vertical_jump, VerticalDirection};
