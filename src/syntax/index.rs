//! Per-document syntax state: the tree plus derived code ranges.

use super::{parse, CodeRange, NodeKind, SyntaxNode};

/// Syntax state for the text currently loaded in the renderer.
///
/// Rebuilt on every text change. Line/Mark consumers iterate only the
/// visible range; the code ranges exist for whole-document regex scans
/// (math) that must skip matches inside code.
#[derive(Debug)]
pub struct SyntaxIndex {
    tree: SyntaxNode,
    code_ranges: Vec<CodeRange>,
    /// Bumped on every rebuild; lets callers detect staleness
    revision: u64,
}

impl Default for SyntaxIndex {
    fn default() -> Self {
        Self {
            tree: SyntaxNode::new(NodeKind::Document, 0, 0),
            code_ranges: Vec::new(),
            revision: 0,
        }
    }
}

impl SyntaxIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-parse `text` and recompute code ranges
    pub fn rebuild(&mut self, text: &str) {
        self.tree = parse(text);
        self.code_ranges = collect_code_ranges(&self.tree);
        self.revision += 1;
        tracing::trace!(
            revision = self.revision,
            code_ranges = self.code_ranges.len(),
            "syntax index rebuilt"
        );
    }

    pub fn tree(&self) -> &SyntaxNode {
        &self.tree
    }

    pub fn code_ranges(&self) -> &[CodeRange] {
        &self.code_ranges
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

/// Collect inline and fenced code spans, ascending and non-overlapping
fn collect_code_ranges(tree: &SyntaxNode) -> Vec<CodeRange> {
    let mut ranges = Vec::new();
    tree.walk(&mut |node| {
        if matches!(node.kind, NodeKind::InlineCode | NodeKind::FencedCode) {
            ranges.push(CodeRange {
                start: node.start,
                end: node.end,
            });
        }
    });
    ranges.sort_by_key(|r| r.start);
    ranges
}
