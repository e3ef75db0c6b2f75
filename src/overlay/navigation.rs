//! Caret navigation over rendered block overlays.
//!
//! A rendered (non-folded) block is atomic for vertical motion: ArrowDown
//! from the line above jumps past the block instead of entering it, and
//! ArrowUp mirrors that. Folded blocks are plain text and use default
//! single-line motion, which is why this module only ever sees the block
//! list produced for the current (non-folded) overlay set.

use crate::overlay::OverlayBlock;
use crate::util::{line_of_offset, line_start, offset_of_line};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalDirection {
    Up,
    Down,
}

/// Compute the caret target for vertical motion when the adjacent line
/// falls inside a rendered block. Returns `None` when default single-line
/// motion applies.
pub fn vertical_jump(
    text: &str,
    caret: usize,
    direction: VerticalDirection,
    blocks: &[OverlayBlock],
) -> Option<usize> {
    let caret_line = line_of_offset(text, caret);
    let target_line = match direction {
        VerticalDirection::Down => caret_line + 1,
        VerticalDirection::Up => caret_line.checked_sub(1)?,
    };
    let target_ls = offset_of_line(text, target_line);
    if direction == VerticalDirection::Down && target_ls <= line_start(text, caret) {
        return None; // already on the last line
    }

    let block = blocks
        .iter()
        .find(|b| target_ls >= b.first_line && target_ls < b.end)?;

    match direction {
        // First position after the block's end, clamped to document end
        VerticalDirection::Down => Some(block.end.min(text.len())),
        // End of the line before the block's start
        VerticalDirection::Up => Some(block.first_line.saturating_sub(1)),
    }
}
