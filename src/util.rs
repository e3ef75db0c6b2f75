//! Small text utilities shared across the decoration pipeline.
//!
//! All offsets are byte offsets; lines are 0-indexed and bounded by `\n`.

/// Byte offset of the start of the line containing `offset`
pub fn line_start(text: &str, offset: usize) -> usize {
    let offset = offset.min(text.len());
    text[..offset].rfind('\n').map_or(0, |i| i + 1)
}

/// Byte offset one past the last content byte of the line containing
/// `offset` (excludes the trailing newline)
pub fn line_end(text: &str, offset: usize) -> usize {
    let offset = offset.min(text.len());
    text[offset..].find('\n').map_or(text.len(), |i| offset + i)
}

/// Full byte range of the line containing `offset`, newline excluded
pub fn line_range(text: &str, offset: usize) -> (usize, usize) {
    (line_start(text, offset), line_end(text, offset))
}

/// 0-indexed line number containing `offset`
pub fn line_of_offset(text: &str, offset: usize) -> usize {
    let offset = offset.min(text.len());
    text[..offset].bytes().filter(|&b| b == b'\n').count()
}

/// Byte offset of the start of the given 0-indexed line, clamped to the
/// end of the text when the line does not exist
pub fn offset_of_line(text: &str, line: usize) -> usize {
    if line == 0 {
        return 0;
    }
    let mut seen = 0;
    for (i, b) in text.bytes().enumerate() {
        if b == b'\n' {
            seen += 1;
            if seen == line {
                return i + 1;
            }
        }
    }
    text.len()
}

/// Start offsets of every line covered by `[start, end)`
pub fn covered_line_starts(text: &str, start: usize, end: usize) -> Vec<usize> {
    let mut starts = vec![line_start(text, start)];
    let end = end.min(text.len());
    let mut pos = starts[0];
    while let Some(i) = text[pos..end.saturating_sub(1).max(pos)].find('\n') {
        pos = pos + i + 1;
        if pos >= end {
            break;
        }
        starts.push(pos);
    }
    starts
}
