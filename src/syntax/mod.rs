//! Syntax index - structural view of the document text
//!
//! Wraps the markdown parser into a [`SyntaxNode`] tree and derives the
//! auxiliary ranges (inline/fenced code) that regex-based scans need to
//! suppress false matches inside code.

mod index;
mod parser;

pub use index::SyntaxIndex;
pub use parser::parse;

/// Node kinds produced by the parser.
///
/// Marker kinds (`HeaderMark`, `EmphasisMark`, `CodeMark`, `LinkMark`,
/// `QuoteMark`, `ListMark`, `TaskMarker`) are derived token children; the
/// rest are spans as reported by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Paragraph,
    /// ATX heading, level 1-6
    Heading(u8),
    HeaderMark,
    Emphasis,
    StrongEmphasis,
    Strikethrough,
    EmphasisMark,
    InlineCode,
    CodeMark,
    CodeInfo,
    FencedCode,
    Link,
    LinkMark,
    Url,
    Blockquote,
    QuoteMark,
    HorizontalRule,
    ListMark,
    TaskMarker,
    Table,
    TableHeader,
    TableDelimiter,
}

/// One node in the syntax tree. Ranges are byte offsets into the parsed
/// text; children are ordered by start offset and fully contained in their
/// parent's range.
#[derive(Debug, Clone)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    pub start: usize,
    pub end: usize,
    pub children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    pub fn new(kind: NodeKind, start: usize, end: usize) -> Self {
        Self {
            kind,
            start,
            end,
            children: Vec::new(),
        }
    }

    /// Depth-first traversal, visiting self before children
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a SyntaxNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

/// A byte range covered by inline or fenced code. Regex scans (math) skip
/// matches that fall inside one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeRange {
    pub start: usize,
    pub end: usize,
}

impl CodeRange {
    pub fn contains(&self, start: usize, end: usize) -> bool {
        start >= self.start && end <= self.end
    }
}

/// Check whether `[start, end)` lies inside any of the given code ranges.
/// `ranges` must be sorted by start offset.
pub fn in_code(ranges: &[CodeRange], start: usize, end: usize) -> bool {
    ranges.iter().any(|r| r.contains(start, end))
}
