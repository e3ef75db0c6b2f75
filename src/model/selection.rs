//! Selection type for the editing surface.

/// A text selection with anchor (start point) and head (cursor position),
/// both byte offsets into the document. The anchor stays fixed while the
/// head moves during selection extension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    /// Where the selection started (fixed point)
    pub anchor: usize,
    /// Where the cursor is (moving point)
    pub head: usize,
}

impl Selection {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// Create a collapsed selection (cursor with no selection)
    pub fn collapsed(pos: usize) -> Self {
        Self {
            anchor: pos,
            head: pos,
        }
    }

    /// Check if selection is empty (anchor == head)
    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    /// Get the start offset (minimum of anchor and head)
    pub fn start(&self) -> usize {
        self.anchor.min(self.head)
    }

    /// Get the end offset (maximum of anchor and head)
    pub fn end(&self) -> usize {
        self.anchor.max(self.head)
    }

    /// Check if selection is reversed (head before anchor)
    pub fn is_reversed(&self) -> bool {
        self.head < self.anchor
    }

    /// Extend selection to a new head offset
    pub fn extend_to(&mut self, pos: usize) {
        self.head = pos;
    }

    /// Collapse selection to the head offset
    pub fn collapse(&mut self) {
        self.anchor = self.head;
    }

    /// Check if a byte range intersects this selection (empty selections
    /// count as intersecting when the caret sits inside the range)
    pub fn intersects(&self, start: usize, end: usize) -> bool {
        if self.is_empty() {
            self.head >= start && self.head <= end
        } else {
            self.start() < end && self.end() > start
        }
    }

    /// Clamp both endpoints into `[0, len]`
    pub fn clamped(&self, len: usize) -> Self {
        Self {
            anchor: self.anchor.min(len),
            head: self.head.min(len),
        }
    }
}
