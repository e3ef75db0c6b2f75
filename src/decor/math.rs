//! Math span scanning and the formula-rendering collaborator boundary.
//!
//! Math is found by regex over the whole document (independent of the
//! viewport), with matches inside code ranges suppressed. Rendering itself
//! is delegated to the host's formula collaborator; failures are caught and
//! surfaced as error decorations, never propagated.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::syntax::{in_code, CodeRange};

// `[^$]` intentionally matches newlines: block math spans lines.
static BLOCK_MATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\$([^$]+?)\$\$").expect("block math regex"));
static INLINE_MATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$([^$\n]+?)\$").expect("inline math regex"));

/// Opaque visual fragment produced by the formula collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathFragment {
    pub markup: String,
}

/// Formula render failure, carried into an error decoration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaError(pub String);

impl std::fmt::Display for FormulaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "formula render failed: {}", self.0)
    }
}

impl std::error::Error for FormulaError {}

/// Host-provided formula-rendering collaborator. `display_mode` selects
/// block layout over inline layout.
pub trait FormulaRenderer {
    fn render(&self, formula: &str, display_mode: bool) -> Result<MathFragment, FormulaError>;
}

/// One math occurrence in the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathSpan {
    /// Full span including the dollar delimiters
    pub start: usize,
    pub end: usize,
    /// The formula body, delimiters excluded
    pub formula: String,
    /// True for `$$...$$`
    pub display: bool,
}

/// Scan the whole text for math spans, skipping anything inside code.
/// Block spans are found first; inline matches overlapping them are
/// discarded so `$$x$$` never also yields `$x$`.
pub fn scan_math(text: &str, code_ranges: &[CodeRange]) -> Vec<MathSpan> {
    let mut spans = Vec::new();

    for caps in BLOCK_MATH.captures_iter(text) {
        let whole = caps.get(0).expect("match group 0");
        if in_code(code_ranges, whole.start(), whole.end()) {
            continue;
        }
        spans.push(MathSpan {
            start: whole.start(),
            end: whole.end(),
            formula: caps.get(1).map_or("", |m| m.as_str()).trim().to_string(),
            display: true,
        });
    }

    for caps in INLINE_MATH.captures_iter(text) {
        let whole = caps.get(0).expect("match group 0");
        let overlaps_block = spans
            .iter()
            .any(|s| s.display && whole.start() < s.end && whole.end() > s.start);
        if overlaps_block || in_code(code_ranges, whole.start(), whole.end()) {
            continue;
        }
        spans.push(MathSpan {
            start: whole.start(),
            end: whole.end(),
            formula: caps.get(1).map_or("", |m| m.as_str()).trim().to_string(),
            display: false,
        });
    }

    spans.sort_by_key(|s| s.start);
    spans
}
