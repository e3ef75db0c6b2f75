//! Decoration construction: one pass over the syntax tree plus a
//! whole-document math scan, producing the ordered decoration set.

use std::collections::HashSet;

use crate::model::Selection;
use crate::syntax::{CodeRange, NodeKind, SyntaxNode};
use crate::util::{covered_line_starts, line_end, line_range, line_start};

use super::math::{scan_math, FormulaRenderer};
use super::{is_folded, Decoration, LineClass, MarkClass, RenderMode, WidgetSide, WidgetSpec};

/// Inputs to a decoration rebuild. `viewport` bounds Line/Mark emission
/// (None means whole document); Replace/Widget scans always run over the
/// full text.
#[derive(Clone, Copy)]
pub struct BuildInput<'a> {
    pub text: &'a str,
    pub tree: &'a SyntaxNode,
    pub code_ranges: &'a [CodeRange],
    pub selection: Selection,
    pub mode: RenderMode,
    pub viewport: Option<(usize, usize)>,
}

/// Build the ordered decoration set for the current tree and cursor state.
///
/// Pure function of its inputs (the formula collaborator included):
/// identical inputs always produce the identical decoration list.
pub fn build(input: &BuildInput<'_>, math: &dyn FormulaRenderer) -> Vec<Decoration> {
    let mut builder = Builder {
        input,
        math,
        task_lines: task_marker_lines(input.text, input.tree),
        out: Vec::new(),
    };

    builder.visit(input.tree);
    builder.emit_math();
    builder.finish()
}

/// Line-start offsets of every line that carries a task marker; list
/// markers on those lines are absorbed into the checkbox replacement.
fn task_marker_lines(text: &str, tree: &SyntaxNode) -> HashSet<usize> {
    let mut lines = HashSet::new();
    tree.walk(&mut |node| {
        if node.kind == NodeKind::TaskMarker {
            lines.insert(line_start(text, node.start));
        }
    });
    lines
}

struct Builder<'a, 'b> {
    input: &'b BuildInput<'a>,
    math: &'b dyn FormulaRenderer,
    task_lines: HashSet<usize>,
    out: Vec<Decoration>,
}

impl Builder<'_, '_> {
    fn folded(&self, start: usize, end: usize) -> bool {
        is_folded(start, end, self.input.selection, self.input.mode)
    }

    /// Fold predicate applied to the whole line containing `offset`
    fn line_folded(&self, offset: usize) -> bool {
        let (ls, le) = line_range(self.input.text, offset);
        self.folded(ls, le)
    }

    fn in_viewport_line(&self, line_start: usize) -> bool {
        self.input.viewport.map_or(true, |(s, e)| {
            line_start <= e && line_end(self.input.text, line_start) >= s
        })
    }

    fn in_viewport_span(&self, start: usize, end: usize) -> bool {
        self.input
            .viewport
            .map_or(true, |(s, e)| start < e && end > s)
    }

    fn push_line(&mut self, line_start: usize, class: LineClass) {
        if self.in_viewport_line(line_start) {
            self.out.push(Decoration::line(line_start, class));
        }
    }

    fn push_mark(&mut self, start: usize, end: usize, class: MarkClass) {
        if self.in_viewport_span(start, end) {
            self.out.push(Decoration::Mark { start, end, class });
        }
    }

    /// Line decorations for every source line covered by `[start, end)`
    fn push_covered_lines(&mut self, start: usize, end: usize, class: LineClass) {
        for ls in covered_line_starts(self.input.text, start, end) {
            self.push_line(ls, class);
        }
    }

    /// Marker tokens dim unless the selection sits inside the token itself
    fn push_marker(&mut self, node: &SyntaxNode) {
        let class = if self.folded(node.start, node.end) {
            MarkClass::Marker
        } else {
            MarkClass::MarkerDim
        };
        self.push_mark(node.start, node.end, class);
    }

    fn visit(&mut self, node: &SyntaxNode) {
        match node.kind {
            NodeKind::Document | NodeKind::Paragraph | NodeKind::Table | NodeKind::TableHeader => {}
            NodeKind::Heading(level) => {
                self.push_line(line_start(self.input.text, node.start), LineClass::Heading(level));
            }
            NodeKind::HeaderMark
            | NodeKind::EmphasisMark
            | NodeKind::QuoteMark
            | NodeKind::CodeMark
            | NodeKind::CodeInfo
            | NodeKind::LinkMark
            | NodeKind::TableDelimiter => {
                self.push_marker(node);
                return;
            }
            NodeKind::Emphasis => self.push_mark(node.start, node.end, MarkClass::Emphasis),
            NodeKind::StrongEmphasis => self.push_mark(node.start, node.end, MarkClass::Strong),
            NodeKind::Strikethrough => {
                self.push_mark(node.start, node.end, MarkClass::Strikethrough)
            }
            NodeKind::Link => self.push_mark(node.start, node.end, MarkClass::Link),
            NodeKind::Url => {}
            NodeKind::InlineCode => {
                if !self.folded(node.start, node.end) {
                    if let Some(code) = inline_code_body(self.input.text, node) {
                        self.out.push(Decoration::Replace {
                            start: node.start,
                            end: node.end,
                            widget: WidgetSpec::InlineCode { code },
                        });
                        // The widget covers the marks; skip the children
                        return;
                    }
                }
            }
            NodeKind::FencedCode => {
                self.push_covered_lines(node.start, node.end, LineClass::FencedCode);
            }
            NodeKind::Blockquote => {
                self.push_covered_lines(node.start, node.end, LineClass::Blockquote);
            }
            NodeKind::ListMark => {
                self.visit_list_mark(node);
                return;
            }
            NodeKind::TaskMarker => {
                self.visit_task_marker(node);
                return;
            }
            NodeKind::HorizontalRule => {
                self.visit_rule(node);
                return;
            }
        }

        // Table rows get their line class from the Table node itself
        if node.kind == NodeKind::Table {
            self.push_covered_lines(node.start, node.end, LineClass::Table);
        }

        for child in &node.children {
            self.visit(child);
        }
    }

    fn visit_list_mark(&mut self, node: &SyntaxNode) {
        let ls = line_start(self.input.text, node.start);
        if self.task_lines.contains(&ls) {
            return; // absorbed into the checkbox replacement
        }
        if self.line_folded(node.start) {
            return; // caret on the line: raw marker stays editable
        }
        let Some(marker) = slice(self.input.text, node.start, node.end) else {
            return;
        };
        let widget = if marker.as_bytes().first().is_some_and(|b| b.is_ascii_digit()) {
            WidgetSpec::Ordered {
                marker: marker.to_string(),
            }
        } else {
            WidgetSpec::Bullet
        };
        self.out.push(Decoration::Replace {
            start: node.start,
            end: node.end,
            widget,
        });
    }

    fn visit_task_marker(&mut self, node: &SyntaxNode) {
        if self.line_folded(node.start) {
            return;
        }
        let ls = line_start(self.input.text, node.start);
        // Span the two-character list prefix ("- ") plus the marker itself
        let start = node.start.saturating_sub(2).max(ls);
        let Some(raw) = slice(self.input.text, node.start, node.end) else {
            return;
        };
        let checked = raw.contains(['x', 'X']);
        self.out.push(Decoration::Replace {
            start,
            end: node.end,
            widget: WidgetSpec::Checkbox { checked },
        });
    }

    fn visit_rule(&mut self, node: &SyntaxNode) {
        if self.folded(node.start, node.end) {
            return;
        }
        let content_end = self.input.text[node.start..node.end]
            .trim_end_matches('\n')
            .len()
            + node.start;
        let ls = line_start(self.input.text, node.start);
        for start in covered_line_starts(self.input.text, node.start, content_end.max(node.start)) {
            if self.in_viewport_line(start) {
                self.out.push(Decoration::Line {
                    line_start: start,
                    class: LineClass::RuleOverlay,
                    height: None,
                    source_text_visible: false,
                });
            }
        }
        self.out.push(Decoration::Widget {
            pos: ls,
            side: WidgetSide::Before,
            widget: WidgetSpec::Rule,
            height: None,
        });
    }

    /// Math decorations: whole-document regex scan filtered by code ranges
    fn emit_math(&mut self) {
        let spans = scan_math(self.input.text, self.input.code_ranges);
        for span in spans {
            if self.folded(span.start, span.end) {
                continue;
            }
            if span.display {
                let widget = match self.math.render(&span.formula, true) {
                    Ok(fragment) => WidgetSpec::MathBlock { fragment },
                    Err(err) => {
                        tracing::warn!(%err, "block formula render failed");
                        WidgetSpec::MathError {
                            raw: self.input.text[span.start..span.end].to_string(),
                        }
                    }
                };
                let starts = covered_line_starts(self.input.text, span.start, span.end);
                for &ls in &starts {
                    self.out.push(Decoration::Line {
                        line_start: ls,
                        class: LineClass::MathBlock,
                        height: None,
                        source_text_visible: false,
                    });
                }
                self.out.push(Decoration::Widget {
                    pos: starts[0],
                    side: WidgetSide::Before,
                    widget,
                    height: None,
                });
            } else {
                let widget = match self.math.render(&span.formula, false) {
                    Ok(fragment) => WidgetSpec::MathInline { fragment },
                    Err(err) => {
                        tracing::warn!(%err, "inline formula render failed");
                        WidgetSpec::MathError {
                            raw: self.input.text[span.start..span.end].to_string(),
                        }
                    }
                };
                self.out.push(Decoration::Replace {
                    start: span.start,
                    end: span.end,
                    widget,
                });
            }
        }
    }

    /// Sort, deduplicate lines by `(line_start, class)`, and drop any
    /// `Replace` overlapping an earlier one (total-order invariant)
    fn finish(mut self) -> Vec<Decoration> {
        self.out.sort_by_key(Decoration::sort_key);

        let mut seen_lines: HashSet<(usize, LineClass)> = HashSet::new();
        let mut last_replace_end = 0usize;
        let mut result = Vec::with_capacity(self.out.len());

        for deco in self.out {
            match &deco {
                Decoration::Line {
                    line_start, class, ..
                } => {
                    if !seen_lines.insert((*line_start, *class)) {
                        continue;
                    }
                }
                Decoration::Replace { start, end, .. } => {
                    if *start < last_replace_end {
                        tracing::debug!(start, end, "dropping overlapping replace decoration");
                        continue;
                    }
                    last_replace_end = *end;
                }
                _ => {}
            }
            result.push(deco);
        }

        result
    }
}

/// The code content between the backtick marks, or None when the range is
/// malformed (isolating that node per the error design)
fn inline_code_body(text: &str, node: &SyntaxNode) -> Option<String> {
    let raw = slice(text, node.start, node.end)?;
    let ticks = raw.bytes().take_while(|&b| b == b'`').count();
    if ticks == 0 || raw.len() < ticks * 2 {
        return None;
    }
    Some(raw[ticks..raw.len() - ticks].trim().to_string())
}

/// Char-boundary-safe slice; returns None instead of panicking on a bad
/// range so one malformed node never aborts the rebuild
fn slice(text: &str, start: usize, end: usize) -> Option<&str> {
    text.get(start..end)
}
