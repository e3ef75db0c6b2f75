//! The single live editing surface.
//!
//! Exactly one renderer exists per host window set; the multiplexer hands
//! it between documents. It owns the live rope buffer, selection, scroll
//! and render mode, and recomputes the decoration pipeline (syntax index ->
//! decoration build -> overlay reconciliation) on every text or selection
//! change.
//!
//! Notification contract: a debounced content-changed message fires for
//! user-driven edits only. Programmatic replacement (`load_document`,
//! `restore`, capture preparation) wraps the mutation in a suppression
//! flag, so switches never produce phantom edits against the wrong
//! document.

use std::time::{Duration, Instant};

use ropey::Rope;

use crate::bridge::{CommandReply, HostCommand, HostMessage};
use crate::config::EngineConfig;
use crate::decor::{build, BuildInput, Decoration, FormulaRenderer, RenderMode};
use crate::model::{CachedState, DocumentId, Selection};
use crate::overlay::{vertical_jump, OverlayBlock, OverlayLayout, VerticalDirection, WidgetMeasure};
use crate::syntax::{NodeKind, SyntaxIndex};
use crate::util::{line_end, line_start};

/// Search panel state (wiring of actual search UI lives in the host)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchPanel {
    pub open: bool,
    pub with_replace: bool,
}

pub struct Renderer {
    buffer: Rope,
    selection: Selection,
    scroll_top: f64,
    mode: RenderMode,
    /// Set around programmatic mutations; user-change notifications are
    /// dropped while true
    suppress_notifications: bool,
    transitions_enabled: bool,
    focused: bool,
    attached: Option<DocumentId>,
    search: SearchPanel,

    index: SyntaxIndex,
    decorations: Vec<Decoration>,
    blocks: Vec<OverlayBlock>,
    layout: OverlayLayout,
    viewport: Option<(usize, usize)>,

    math: Box<dyn FormulaRenderer>,
    measure: Box<dyn WidgetMeasure>,

    debounce: Duration,
    /// Instant of the last unflushed user edit
    pending_change_at: Option<Instant>,
}

impl Renderer {
    pub fn new(
        config: &EngineConfig,
        math: Box<dyn FormulaRenderer>,
        measure: Box<dyn WidgetMeasure>,
    ) -> Self {
        Self {
            buffer: Rope::new(),
            selection: Selection::default(),
            scroll_top: 0.0,
            mode: RenderMode::Editing,
            suppress_notifications: false,
            transitions_enabled: true,
            focused: false,
            attached: None,
            search: SearchPanel::default(),
            index: SyntaxIndex::new(),
            decorations: Vec::new(),
            blocks: Vec::new(),
            layout: OverlayLayout::new(config.min_line_height),
            viewport: None,
            math,
            measure,
            debounce: config.debounce(),
            pending_change_at: None,
        }
    }

    // === Accessors ===

    pub fn attached(&self) -> Option<DocumentId> {
        self.attached
    }

    /// Record `id` as the renderer's owner without touching the buffer.
    /// Used after `restore`, which carries no document identity itself.
    pub fn attach(&mut self, id: DocumentId) {
        self.attached = Some(id);
        self.pending_change_at = None;
    }

    pub fn detach(&mut self) {
        self.attached = None;
        self.pending_change_at = None;
    }

    pub fn text(&self) -> String {
        self.buffer.to_string()
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn decorations(&self) -> &[Decoration] {
        &self.decorations
    }

    pub fn overlay_blocks(&self) -> &[OverlayBlock] {
        &self.blocks
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn search_panel(&self) -> SearchPanel {
        self.search
    }

    pub fn get_cursor_position(&self) -> usize {
        self.selection.head
    }

    pub fn get_scroll_top(&self) -> f64 {
        self.scroll_top
    }

    // === Programmatic state operations (suppressed) ===

    /// Replace the whole buffer for a newly attached document. Resets
    /// selection and scroll; fires no change notification.
    pub fn load_document(&mut self, id: DocumentId, text: &str) {
        self.suppressed(|r| {
            r.buffer = Rope::from_str(text);
            r.selection = Selection::collapsed(0);
            r.scroll_top = 0.0;
            r.attached = Some(id);
            r.recompute(true);
        });
        tracing::debug!(%id, len = self.buffer.len_bytes(), "document loaded");
    }

    /// Synchronous snapshot of the live editing state
    pub fn serialize(&self) -> CachedState {
        CachedState {
            text: self.text(),
            selection_anchor: self.selection.anchor,
            selection_head: self.selection.head,
            scroll_top: self.scroll_top,
        }
    }

    /// Atomic buffer+selection+scroll replacement. Out-of-range offsets
    /// are clamped, never an error.
    pub fn restore(&mut self, state: &CachedState) {
        self.suppressed(|r| {
            r.buffer = Rope::from_str(&state.text);
            let len = state.text.len();
            r.selection = Selection::new(
                r.snap(state.selection_anchor.min(len)),
                r.snap(state.selection_head.min(len)),
            );
            r.scroll_top = state.scroll_top.max(0.0);
            r.recompute(true);
        });
    }

    /// Enter capture mode: collapse selection to the origin, blur, disable
    /// transitions. Scroll is deliberately untouched so the snapshot shows
    /// the viewport the user last saw.
    pub fn prepare_for_capture(&mut self) {
        self.suppressed(|r| {
            r.selection = Selection::collapsed(0);
            r.focused = false;
            r.transitions_enabled = false;
            r.mode = RenderMode::Capturing;
            r.recompute(false);
        });
    }

    /// Leave capture mode and restore interactive behavior
    pub fn end_capture(&mut self) {
        self.suppressed(|r| {
            r.mode = RenderMode::Editing;
            r.transitions_enabled = true;
            r.recompute(false);
        });
    }

    pub fn set_cursor_position(&mut self, offset: usize) {
        self.selection = Selection::collapsed(self.snap(offset.min(self.buffer.len_bytes())));
        self.recompute(false);
    }

    pub fn set_scroll_top(&mut self, pixels: f64) {
        self.scroll_top = pixels.max(0.0);
    }

    pub fn set_selection(&mut self, selection: Selection) {
        let len = self.buffer.len_bytes();
        let clamped = selection.clamped(len);
        self.selection = Selection::new(self.snap(clamped.anchor), self.snap(clamped.head));
        self.recompute(false);
    }

    /// Switch between editing and read-only rendered presentation.
    /// Capture mode is entered through `prepare_for_capture` instead.
    pub fn set_render_mode(&mut self, mode: RenderMode) {
        if mode != RenderMode::Capturing {
            self.mode = mode;
            self.recompute(false);
        }
    }

    /// Visible byte range for viewport-bounded Line/Mark decorations
    pub fn set_viewport(&mut self, range: Option<(usize, usize)>) {
        self.viewport = range;
        self.recompute(false);
    }

    pub fn focus(&mut self) {
        self.focused = true;
    }

    pub fn open_search(&mut self, with_replace: bool) {
        self.search = SearchPanel {
            open: true,
            with_replace,
        };
    }

    // === User-driven edits (notify, debounced) ===

    /// Insert text at a byte offset as a user edit
    pub fn insert(&mut self, at: usize, text: &str, now: Instant) {
        let at = self.snap(at.min(self.buffer.len_bytes()));
        let char_at = self.buffer.byte_to_char(at);
        self.buffer.insert(char_at, text);
        self.selection = Selection::collapsed(at + text.len());
        self.note_user_change(now);
        self.recompute(true);
    }

    /// Delete a byte range as a user edit
    pub fn delete_range(&mut self, start: usize, end: usize, now: Instant) {
        let len = self.buffer.len_bytes();
        let start = self.snap(start.min(len));
        let end = self.snap(end.min(len)).max(start);
        if start == end {
            return;
        }
        let cs = self.buffer.byte_to_char(start);
        let ce = self.buffer.byte_to_char(end);
        self.buffer.remove(cs..ce);
        self.selection = Selection::collapsed(start);
        self.note_user_change(now);
        self.recompute(true);
    }

    /// Replace a byte range with new text as a user edit
    pub fn replace_range(&mut self, start: usize, end: usize, text: &str, now: Instant) {
        let len = self.buffer.len_bytes();
        let start = self.snap(start.min(len));
        let end = self.snap(end.min(len)).max(start);
        let cs = self.buffer.byte_to_char(start);
        let ce = self.buffer.byte_to_char(end);
        self.buffer.remove(cs..ce);
        self.buffer.insert(cs, text);
        self.selection = Selection::collapsed(start + text.len());
        self.note_user_change(now);
        self.recompute(true);
    }

    /// Vertical caret motion that treats rendered blocks as atomic
    pub fn move_cursor_vertical(&mut self, direction: VerticalDirection) {
        let text = self.text();
        let caret = self.selection.head;
        let target = vertical_jump(&text, caret, direction, &self.blocks)
            .or_else(|| default_vertical_move(&text, caret, direction));
        if let Some(target) = target {
            self.selection = Selection::collapsed(target);
            self.recompute(false);
        }
    }

    /// Flush the debounced change notification if it is due
    pub fn tick(&mut self, now: Instant) -> Option<HostMessage> {
        let at = self.pending_change_at?;
        if now.duration_since(at) < self.debounce {
            return None;
        }
        self.pending_change_at = None;
        let document_id = self.attached?;
        Some(HostMessage::ContentChanged {
            document_id,
            content: self.text(),
        })
    }

    /// URL of the link span containing `offset`, for host click handling
    pub fn link_at(&self, offset: usize) -> Option<String> {
        let mut url = None;
        let text = self.text();
        self.index.tree().walk(&mut |node| {
            if node.kind == NodeKind::Url && offset >= node.start && offset < node.end {
                url = text.get(node.start..node.end).map(str::to_string);
            }
            if node.kind == NodeKind::Link
                && offset >= node.start
                && offset < node.end
                && url.is_none()
            {
                // Fall back to the whole link span for autolinks
                url = node
                    .children
                    .iter()
                    .find(|c| c.kind == NodeKind::Url)
                    .and_then(|c| text.get(c.start..c.end))
                    .map(str::to_string);
            }
        });
        url
    }

    /// Effect for a click on a link span: an open-URL request for the host
    pub fn open_link(&self, offset: usize) -> Option<HostMessage> {
        self.link_at(offset).map(|url| HostMessage::OpenUrl { url })
    }

    /// Dispatch one inbound host command
    pub fn handle_command(&mut self, command: HostCommand) -> CommandReply {
        match command {
            HostCommand::LoadDocument { document_id, text } => {
                self.load_document(document_id, &text);
                CommandReply::None
            }
            HostCommand::GetContent => CommandReply::Content(self.text()),
            HostCommand::Serialize => CommandReply::State(self.serialize()),
            HostCommand::Restore { state } => {
                self.restore(&state);
                CommandReply::None
            }
            HostCommand::SetCursorPosition { offset } => {
                self.set_cursor_position(offset);
                CommandReply::None
            }
            HostCommand::SetScrollTop { pixels } => {
                self.set_scroll_top(pixels);
                CommandReply::None
            }
            HostCommand::PrepareForCapture => {
                self.prepare_for_capture();
                CommandReply::None
            }
            HostCommand::EndCapture => {
                self.end_capture();
                CommandReply::None
            }
            HostCommand::Focus => {
                self.focus();
                CommandReply::None
            }
            HostCommand::OpenSearch => {
                self.open_search(false);
                CommandReply::None
            }
            HostCommand::OpenSearchWithReplace => {
                self.open_search(true);
                CommandReply::None
            }
        }
    }

    // === Internals ===

    fn suppressed(&mut self, f: impl FnOnce(&mut Self)) {
        let prev = self.suppress_notifications;
        self.suppress_notifications = true;
        // A pending user notification from the previous content must not
        // fire against programmatically replaced text
        self.pending_change_at = None;
        f(self);
        self.suppress_notifications = prev;
    }

    fn note_user_change(&mut self, now: Instant) {
        if !self.suppress_notifications {
            self.pending_change_at = Some(now);
        }
    }

    /// Snap a byte offset to the nearest char boundary at or before it
    fn snap(&self, offset: usize) -> usize {
        let offset = offset.min(self.buffer.len_bytes());
        let char_idx = self.buffer.byte_to_char(offset);
        self.buffer.char_to_byte(char_idx)
    }

    /// Recompute the decoration pipeline. `reparse` re-runs the syntax
    /// index; selection-only changes skip it.
    fn recompute(&mut self, reparse: bool) {
        let text = self.buffer.to_string();
        if reparse || self.index.revision() == 0 {
            self.index.rebuild(&text);
        }
        let input = BuildInput {
            text: &text,
            tree: self.index.tree(),
            code_ranges: self.index.code_ranges(),
            selection: self.selection,
            mode: self.mode,
            viewport: self.viewport,
        };
        let mut decorations = build(&input, self.math.as_ref());
        self.blocks = self
            .layout
            .reconcile(&mut decorations, &text, self.measure.as_mut());
        self.decorations = decorations;
    }
}

/// Plain single-line vertical motion, preserving the caret column where
/// the target line allows it
fn default_vertical_move(text: &str, caret: usize, direction: VerticalDirection) -> Option<usize> {
    let ls = line_start(text, caret);
    let column = caret - ls;
    let target_ls = match direction {
        VerticalDirection::Down => {
            let le = line_end(text, caret);
            if le >= text.len() {
                return None;
            }
            le + 1
        }
        VerticalDirection::Up => {
            if ls == 0 {
                return None;
            }
            line_start(text, ls - 1)
        }
    };
    Some((target_ls + column).min(line_end(text, target_ls)))
}
