//! Markdown structure extraction
//!
//! Wraps pulldown-cmark's offset iterator into the [`SyntaxNode`] tree.
//! pulldown reports element spans only, so the marker tokens the decoration
//! engine needs (heading hashes, emphasis delimiters, backticks, link
//! brackets, quote and list markers) are derived here from the element
//! ranges and the source text. pulldown types never leak out of this module.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag};

use super::{NodeKind, SyntaxNode};

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Parse `text` into a syntax tree rooted at a `Document` node.
///
/// Pure function of the input; never fails (unrecognized constructs simply
/// produce no nodes).
pub fn parse(text: &str) -> SyntaxNode {
    let options =
        Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES | Options::ENABLE_TASKLISTS;
    let parser = Parser::new_ext(text, options);

    let mut root = SyntaxNode::new(NodeKind::Document, 0, text.len());
    // Containers we track get Some; containers we flatten (lists, rows,
    // images) get None so start/end events stay balanced either way.
    let mut stack: Vec<Option<SyntaxNode>> = Vec::new();

    for (event, range) in parser.into_offset_iter() {
        match event {
            Event::Start(tag) => {
                let node = match tag {
                    Tag::Paragraph => Some(NodeKind::Paragraph),
                    Tag::Heading { level, .. } => Some(NodeKind::Heading(heading_level(level))),
                    Tag::BlockQuote(_) => Some(NodeKind::Blockquote),
                    Tag::CodeBlock(CodeBlockKind::Fenced(_) | CodeBlockKind::Indented) => {
                        Some(NodeKind::FencedCode)
                    }
                    Tag::Emphasis => Some(NodeKind::Emphasis),
                    Tag::Strong => Some(NodeKind::StrongEmphasis),
                    Tag::Strikethrough => Some(NodeKind::Strikethrough),
                    Tag::Link { .. } => Some(NodeKind::Link),
                    Tag::Table(_) => Some(NodeKind::Table),
                    Tag::TableHead => Some(NodeKind::TableHeader),
                    Tag::Item => {
                        // List items are flattened, but the marker token at
                        // the item head is attached right away.
                        if let Some(mark) = scan_list_mark(text, range.start) {
                            attach(&mut root, &mut stack, mark);
                        }
                        None
                    }
                    _ => None,
                };
                stack.push(node.map(|kind| SyntaxNode::new(kind, range.start, range.end)));
            }
            Event::End(_) => {
                if let Some(Some(mut node)) = stack.pop() {
                    derive_markers(text, &mut node);
                    node.children.sort_by_key(|c| c.start);
                    attach(&mut root, &mut stack, node);
                }
            }
            Event::Code(_) => {
                let mut node = SyntaxNode::new(NodeKind::InlineCode, range.start, range.end);
                derive_code_marks(text, &mut node);
                attach(&mut root, &mut stack, node);
            }
            Event::Rule => {
                let node = SyntaxNode::new(NodeKind::HorizontalRule, range.start, range.end);
                attach(&mut root, &mut stack, node);
            }
            Event::TaskListMarker(_) => {
                let node = SyntaxNode::new(NodeKind::TaskMarker, range.start, range.end);
                attach(&mut root, &mut stack, node);
            }
            _ => {}
        }
    }

    root.children.sort_by_key(|c| c.start);
    root
}

/// Attach `node` to the innermost open container, or the root if none
fn attach(root: &mut SyntaxNode, stack: &mut [Option<SyntaxNode>], node: SyntaxNode) {
    for parent in stack.iter_mut().rev() {
        if let Some(parent) = parent {
            parent.children.push(node);
            return;
        }
    }
    root.children.push(node);
}

/// Derive marker-token children for a completed span node
fn derive_markers(text: &str, node: &mut SyntaxNode) {
    match node.kind {
        NodeKind::Heading(_) => derive_header_mark(text, node),
        NodeKind::Emphasis => derive_delimiters(node, 1),
        NodeKind::StrongEmphasis | NodeKind::Strikethrough => derive_delimiters(node, 2),
        NodeKind::FencedCode => derive_fence_marks(text, node),
        NodeKind::Link => derive_link_marks(text, node),
        NodeKind::Blockquote => derive_quote_marks(text, node),
        NodeKind::TableHeader => derive_table_delimiter(text, node),
        _ => {}
    }
}

fn derive_header_mark(text: &str, node: &mut SyntaxNode) {
    let slice = &text[node.start..node.end];
    let hashes = slice.bytes().take_while(|&b| b == b'#').count();
    if hashes == 0 {
        return; // setext heading, no ATX marker
    }
    // Include the separating space so the whole prefix dims as one token
    let mut end = node.start + hashes;
    if slice.as_bytes().get(hashes) == Some(&b' ') {
        end += 1;
    }
    node.children
        .push(SyntaxNode::new(NodeKind::HeaderMark, node.start, end));
}

fn derive_delimiters(node: &mut SyntaxNode, width: usize) {
    if node.end - node.start < width * 2 {
        return;
    }
    node.children.push(SyntaxNode::new(
        NodeKind::EmphasisMark,
        node.start,
        node.start + width,
    ));
    node.children.push(SyntaxNode::new(
        NodeKind::EmphasisMark,
        node.end - width,
        node.end,
    ));
}

fn derive_code_marks(text: &str, node: &mut SyntaxNode) {
    let slice = &text[node.start..node.end];
    let ticks = slice.bytes().take_while(|&b| b == b'`').count();
    if ticks == 0 || node.end - node.start < ticks * 2 {
        return;
    }
    if !slice.ends_with(&"`".repeat(ticks)) {
        return;
    }
    node.children.push(SyntaxNode::new(
        NodeKind::CodeMark,
        node.start,
        node.start + ticks,
    ));
    node.children.push(SyntaxNode::new(
        NodeKind::CodeMark,
        node.end - ticks,
        node.end,
    ));
}

fn derive_fence_marks(text: &str, node: &mut SyntaxNode) {
    let slice = &text[node.start..node.end];
    let first_line_end = slice.find('\n').unwrap_or(slice.len());
    let first_line = &slice[..first_line_end];
    let indent = first_line.len() - first_line.trim_start_matches(' ').len();
    let fence_char = first_line.as_bytes().get(indent).copied();
    if fence_char != Some(b'`') && fence_char != Some(b'~') {
        return; // indented code block, no fence tokens
    }
    let fence_char = fence_char.unwrap_or(b'`');
    let run = first_line[indent..]
        .bytes()
        .take_while(|&b| b == fence_char)
        .count();

    let open_start = node.start + indent;
    node.children.push(SyntaxNode::new(
        NodeKind::CodeMark,
        open_start,
        open_start + run,
    ));

    // Info string: rest of the opening fence line
    let info = first_line[indent + run..].trim();
    if !info.is_empty() {
        let info_off = first_line[indent + run..]
            .find(info)
            .map_or(0, |i| indent + run + i);
        node.children.push(SyntaxNode::new(
            NodeKind::CodeInfo,
            node.start + info_off,
            node.start + info_off + info.len(),
        ));
    }

    // Closing fence, if the block is terminated
    if let Some(last_nl) = slice.trim_end_matches('\n').rfind('\n') {
        let last_line = slice[last_nl + 1..].trim_end_matches('\n');
        let trimmed = last_line.trim_start_matches(' ');
        let close_indent = last_line.len() - trimmed.len();
        let close_run = trimmed.bytes().take_while(|&b| b == fence_char).count();
        if close_run >= run && trimmed[close_run..].trim().is_empty() {
            let close_start = node.start + last_nl + 1 + close_indent;
            node.children.push(SyntaxNode::new(
                NodeKind::CodeMark,
                close_start,
                close_start + close_run,
            ));
        }
    }
}

fn derive_link_marks(text: &str, node: &mut SyntaxNode) {
    let slice = &text[node.start..node.end];
    if !slice.starts_with('[') {
        return; // autolink or reference shorthand
    }
    node.children.push(SyntaxNode::new(
        NodeKind::LinkMark,
        node.start,
        node.start + 1,
    ));
    // Inline form `[label](url)`: split at the last `](`
    if slice.ends_with(')') {
        if let Some(split) = slice.rfind("](") {
            node.children.push(SyntaxNode::new(
                NodeKind::LinkMark,
                node.start + split,
                node.start + split + 2,
            ));
            if node.start + split + 2 < node.end - 1 {
                node.children.push(SyntaxNode::new(
                    NodeKind::Url,
                    node.start + split + 2,
                    node.end - 1,
                ));
            }
            node.children
                .push(SyntaxNode::new(NodeKind::LinkMark, node.end - 1, node.end));
        }
    }
}

fn derive_quote_marks(text: &str, node: &mut SyntaxNode) {
    let slice = &text[node.start..node.end];
    let mut line_start = 0;
    loop {
        let line_end = slice[line_start..]
            .find('\n')
            .map_or(slice.len(), |i| line_start + i);
        let line = &slice[line_start..line_end];
        let indent = line.len() - line.trim_start_matches(' ').len();
        if line.as_bytes().get(indent) == Some(&b'>') {
            let mark = node.start + line_start + indent;
            node.children
                .push(SyntaxNode::new(NodeKind::QuoteMark, mark, mark + 1));
        }
        if line_end >= slice.len() {
            break;
        }
        line_start = line_end + 1;
    }
}

/// The delimiter row (`|---|---|`) sits on the line after the header row
fn derive_table_delimiter(text: &str, node: &mut SyntaxNode) {
    // The header span may or may not include its trailing newline
    let delim_start = if text[..node.end].ends_with('\n') {
        node.end
    } else {
        match text[node.end..].find('\n') {
            Some(i) => node.end + i + 1,
            None => return,
        }
    };
    if delim_start >= text.len() {
        return;
    }
    let delim_end = text[delim_start..]
        .find('\n')
        .map_or(text.len(), |i| delim_start + i);
    let line = &text[delim_start..delim_end];
    if line.contains('-') && line.contains('|') {
        node.children.push(SyntaxNode::new(
            NodeKind::TableDelimiter,
            delim_start,
            delim_end,
        ));
    }
}

/// Scan a bullet or ordered-list marker at the head of a list item
fn scan_list_mark(text: &str, item_start: usize) -> Option<SyntaxNode> {
    let slice = &text[item_start..];
    let bytes = slice.as_bytes();
    match bytes.first()? {
        b'-' | b'*' | b'+' => Some(SyntaxNode::new(
            NodeKind::ListMark,
            item_start,
            item_start + 1,
        )),
        b'0'..=b'9' => {
            let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            match bytes.get(digits) {
                Some(b'.' | b')') => Some(SyntaxNode::new(
                    NodeKind::ListMark,
                    item_start,
                    item_start + digits + 1,
                )),
                _ => None,
            }
        }
        _ => None,
    }
}
