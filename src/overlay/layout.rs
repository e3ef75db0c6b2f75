//! Height reconciliation for block-level overlays.
//!
//! The rendered widget's natural height is measured once (cached for the
//! session) and distributed across the covered source lines so that caret
//! and click geometry stays pixel-accurate underneath the widget.

use std::collections::HashMap;

use crate::decor::{Decoration, LineClass, WidgetSpec};
use crate::util::line_end;

/// Kind key for the measurement cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayKind {
    MathBlock,
    Rule,
}

/// Host-side measurement collaborator. Returns the widget's natural height
/// in surface pixels; `None` means measurement failed and the block keeps
/// natural flow.
pub trait WidgetMeasure {
    fn natural_height(&mut self, kind: OverlayKind, content: &str) -> Option<f32>;
}

/// Reconciled geometry for one block overlay. Only non-folded blocks get
/// one (folded blocks revert to natural flow and have no overlay).
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayBlock {
    /// Source byte range the overlay stands in for
    pub start: usize,
    pub end: usize,
    /// Line-start offset of the first covered line
    pub first_line: usize,
    pub covered_lines: usize,
    /// Height applied to every covered line except possibly the last
    pub line_height: f32,
    /// The widget's measured bounding-box height
    pub total_height: f32,
}

/// Owns the measurement cache; one instance lives for the renderer session.
/// The cache is never evicted - it is bounded by the number of distinct
/// formulas and rules the session sees.
#[derive(Default)]
pub struct OverlayLayout {
    cache: HashMap<(OverlayKind, String), f32>,
    min_line_height: f32,
}

impl OverlayLayout {
    pub fn new(min_line_height: f32) -> Self {
        Self {
            cache: HashMap::new(),
            min_line_height,
        }
    }

    /// Number of cached measurements (diagnostics)
    pub fn cached_measurements(&self) -> usize {
        self.cache.len()
    }

    /// Reconcile overlay geometry in-place: assign per-line heights to the
    /// covered `Line` rows and a bounding-box height to each overlay
    /// `Widget`. Returns the resulting block list for navigation.
    ///
    /// Measurement failure on one block reverts that block's rows to
    /// natural visible flow and moves on; the rest of the set is kept.
    pub fn reconcile(
        &mut self,
        decorations: &mut [Decoration],
        text: &str,
        measure: &mut dyn WidgetMeasure,
    ) -> Vec<OverlayBlock> {
        let mut blocks = Vec::new();

        // Indices of overlay widgets, processed in document order
        let widget_idx: Vec<usize> = decorations
            .iter()
            .enumerate()
            .filter_map(|(i, d)| match d {
                Decoration::Widget { widget, .. } if overlay_key(widget).is_some() => Some(i),
                _ => None,
            })
            .collect();

        for i in widget_idx {
            let (pos, kind, content) = match &decorations[i] {
                Decoration::Widget { pos, widget, .. } => {
                    let (kind, content) = overlay_key(widget).expect("filtered above");
                    (*pos, kind, content.to_string())
                }
                _ => unreachable!(),
            };

            let line_class = match kind {
                OverlayKind::MathBlock => LineClass::MathBlock,
                OverlayKind::Rule => LineClass::RuleOverlay,
            };
            let rows = contiguous_rows(decorations, text, pos, line_class);
            if rows.is_empty() {
                continue;
            }

            let measured = match self.measure_cached(kind, &content, measure) {
                Some(h) => h,
                None => {
                    tracing::warn!(pos, ?kind, "widget measurement failed, keeping natural flow");
                    for &row in &rows {
                        if let Decoration::Line {
                            source_text_visible,
                            ..
                        } = &mut decorations[row]
                        {
                            *source_text_visible = true;
                        }
                    }
                    continue;
                }
            };

            let n = rows.len();
            let per_line = (measured / n as f32).ceil().max(self.min_line_height);
            // Last row absorbs the rounding so the heights sum exactly to
            // the measured height (unless the minimum height binds)
            let last = (measured - per_line * (n - 1) as f32).max(self.min_line_height);
            for (row_no, &row) in rows.iter().enumerate() {
                if let Decoration::Line { height, .. } = &mut decorations[row] {
                    *height = Some(if row_no + 1 == n { last } else { per_line });
                }
            }

            let last_row_start = match &decorations[*rows.last().expect("non-empty")] {
                Decoration::Line { line_start, .. } => *line_start,
                _ => pos,
            };
            if let Decoration::Widget { height, .. } = &mut decorations[i] {
                *height = Some(measured);
            }
            blocks.push(OverlayBlock {
                start: pos,
                end: line_end(text, last_row_start),
                first_line: pos,
                covered_lines: n,
                line_height: per_line,
                total_height: measured,
            });
        }

        blocks
    }

    fn measure_cached(
        &mut self,
        kind: OverlayKind,
        content: &str,
        measure: &mut dyn WidgetMeasure,
    ) -> Option<f32> {
        if let Some(&h) = self.cache.get(&(kind, content.to_string())) {
            return Some(h);
        }
        let h = measure.natural_height(kind, content)?;
        self.cache.insert((kind, content.to_string()), h);
        Some(h)
    }
}

/// Cache key for an overlay widget, or None for non-overlay widgets
fn overlay_key(widget: &WidgetSpec) -> Option<(OverlayKind, &str)> {
    match widget {
        WidgetSpec::MathBlock { fragment } => Some((OverlayKind::MathBlock, &fragment.markup)),
        WidgetSpec::MathError { raw } => Some((OverlayKind::MathBlock, raw)),
        WidgetSpec::Rule => Some((OverlayKind::Rule, "")),
        _ => None,
    }
}

/// Row indices of the contiguous hidden `Line` run starting at `pos`
fn contiguous_rows(
    decorations: &[Decoration],
    text: &str,
    pos: usize,
    class: LineClass,
) -> Vec<usize> {
    let mut rows = Vec::new();
    let mut expected = pos;
    for (i, deco) in decorations.iter().enumerate() {
        if let Decoration::Line {
            line_start,
            class: c,
            ..
        } = deco
        {
            if *c == class && *line_start == expected {
                rows.push(i);
                expected = line_end(text, *line_start) + 1;
            }
        }
    }
    rows
}
