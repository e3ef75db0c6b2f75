//! Decoration engine - syntax tree + cursor + mode -> visual decoration set
//!
//! Decorations are plain data consumed by whatever rendering surface the
//! host provides: line classes, inline marks, content replacements and
//! positioned widgets. The builder guarantees a total order by position,
//! non-overlapping `Replace` ranges, and `(line, class)` deduplication for
//! line decorations.

mod builder;
mod math;

pub use builder::{build, BuildInput};
pub use math::{scan_math, FormulaError, FormulaRenderer, MathFragment, MathSpan};

use crate::model::Selection;

/// Render mode for the surface. `Capturing` forces rendered behavior for
/// every fold-sensitive decoration regardless of cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    #[default]
    Editing,
    Rendered,
    Capturing,
}

/// The single shared fold predicate.
///
/// A fold-sensitive range is "folded" (raw source shown, widget hidden)
/// when the whole selection sits inside it. Capture mode never folds, so
/// snapshots always show the rendered form. Every fold-sensitive feature
/// goes through this one function.
pub fn is_folded(start: usize, end: usize, selection: Selection, mode: RenderMode) -> bool {
    mode != RenderMode::Capturing && selection.start() >= start && selection.end() <= end
}

/// Style class for a `Line` decoration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineClass {
    /// Heading with size class, level 1-6
    Heading(u8),
    FencedCode,
    Blockquote,
    Table,
    /// Height-reconciled row under a block math overlay
    MathBlock,
    /// Height-reconciled row under a horizontal-rule overlay
    RuleOverlay,
}

/// Style class for a `Mark` decoration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkClass {
    /// Marker token on the caret's line (plain, visible)
    Marker,
    /// Marker token away from the caret (dimmed)
    MarkerDim,
    Emphasis,
    Strong,
    Strikethrough,
    Link,
}

/// Where a `Widget` decoration sits relative to its anchor position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetSide {
    Before,
    After,
}

/// Payload describing what a `Replace`/`Widget` decoration renders as
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetSpec {
    InlineCode { code: String },
    Bullet,
    Ordered { marker: String },
    Checkbox { checked: bool },
    MathInline { fragment: MathFragment },
    MathBlock { fragment: MathFragment },
    /// Formula render failure: raw formula text stays visible
    MathError { raw: String },
    Rule,
}

/// A computed visual annotation, ordered by [`Decoration::sort_key`].
#[derive(Debug, Clone, PartialEq)]
pub enum Decoration {
    /// Whole-line styling. `height`/`source_text_visible` carry overlay
    /// geometry once reconciled; `height == None` means natural flow.
    Line {
        line_start: usize,
        class: LineClass,
        height: Option<f32>,
        source_text_visible: bool,
    },
    /// Inline span styling
    Mark {
        start: usize,
        end: usize,
        class: MarkClass,
    },
    /// Replace a source range with a rendered widget
    Replace {
        start: usize,
        end: usize,
        widget: WidgetSpec,
    },
    /// Positioned widget; `height` is filled in by overlay reconciliation
    Widget {
        pos: usize,
        side: WidgetSide,
        widget: WidgetSpec,
        height: Option<f32>,
    },
}

impl Decoration {
    pub fn line(line_start: usize, class: LineClass) -> Self {
        Self::Line {
            line_start,
            class,
            height: None,
            source_text_visible: true,
        }
    }

    /// Position of this decoration in document order
    pub fn pos(&self) -> usize {
        match self {
            Self::Line { line_start, .. } => *line_start,
            Self::Mark { start, .. } | Self::Replace { start, .. } => *start,
            Self::Widget { pos, .. } => *pos,
        }
    }

    /// Total order: position, then kind (line, widget-before, replace,
    /// mark, widget-after), then end offset
    pub fn sort_key(&self) -> (usize, u8, usize) {
        match self {
            Self::Line { line_start, .. } => (*line_start, 0, *line_start),
            Self::Widget {
                pos,
                side: WidgetSide::Before,
                ..
            } => (*pos, 1, *pos),
            Self::Replace { start, end, .. } => (*start, 2, *end),
            Self::Mark { start, end, .. } => (*start, 3, *end),
            Self::Widget {
                pos,
                side: WidgetSide::After,
                ..
            } => (*pos, 4, *pos),
        }
    }
}
