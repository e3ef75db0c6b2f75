//! State cache / multiplexer - one live surface shared across documents.
//!
//! The multiplexer owns the renderer and decides which document holds it.
//! Switching away serializes the old owner's state synchronously *before*
//! capture preparation resets the selection (that ordering is load-bearing),
//! captures a static snapshot to stand in for the detached document, then
//! attaches the new owner from cache or from the store's document record.
//!
//! Exactly one document is attached at any instant. Detach of the old owner
//! only ever runs inside the new owner's attach path, so rapid focus
//! changes cannot race two switch sequences. Host callbacks on the pumped
//! event loop request switches through [`SwitchQueue`] rather than calling
//! in; a request landing mid-switch runs only after the in-flight switch
//! commits `active_id`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

use crate::bridge::{await_bounded, EventPump, HostMessage, PendingOp};
use crate::config::EngineConfig;
use crate::model::{CachedState, Document, DocumentId};
use crate::renderer::Renderer;

/// Raw pixel capture delivered by the surface host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotPixels {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Static stand-in image for a detached document. The text preview variant
/// is the capture-failure fallback: a window must never stay blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotImage {
    Pixels(SnapshotPixels),
    TextPreview(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub document_id: DocumentId,
    pub image: SnapshotImage,
    pub captured_at: Instant,
}

/// Cloneable handle for requesting a switch from host callbacks.
///
/// Focus changes arrive on the host event loop, which may be pumped while
/// a switch is already in flight. Callbacks never call into the
/// multiplexer directly; they deposit the target document here, and the
/// running `switch_active` drains the slot only after it has committed its
/// own owner. One slot, latest request wins.
#[derive(Clone, Default)]
pub struct SwitchQueue {
    slot: Rc<RefCell<Option<Document>>>,
}

impl SwitchQueue {
    /// Replace any earlier undrained request with `doc`
    pub fn request(&self, doc: Document) {
        *self.slot.borrow_mut() = Some(doc);
    }

    pub fn has_request(&self) -> bool {
        self.slot.borrow().is_some()
    }

    fn take(&self) -> Option<Document> {
        self.slot.borrow_mut().take()
    }
}

/// Surface-side collaborator for the switch path: paint cycles, pixel
/// capture, and snapshot overlay management for detached documents.
pub trait SurfaceHost {
    /// Completes after the next paint cycle
    fn request_frame(&mut self) -> PendingOp<()>;
    /// Completes with a pixel capture of the current surface
    fn request_snapshot(&mut self) -> PendingOp<SnapshotPixels>;
    /// Show a static snapshot overlay for a detached document's window
    fn show_snapshot(&mut self, snapshot: &Snapshot);
    /// Remove the overlay and reveal the live surface for `id`
    fn reveal_live(&mut self, id: DocumentId);
}

pub struct Multiplexer {
    renderer: Renderer,
    active_id: Option<DocumentId>,
    cache: HashMap<DocumentId, CachedState>,
    snapshots: HashMap<DocumentId, Snapshot>,
    /// Renderer startup complete; serialize/capture are unsafe before this
    ready: bool,
    /// Switch requests deposited by pumped host callbacks
    requests: SwitchQueue,
    /// Store-side content of every document seen, for snapshot fallbacks
    known_text: HashMap<DocumentId, String>,
    /// Set on the first user-triggered switch; pre-rendering is only
    /// allowed before that
    user_switched: bool,
    config: EngineConfig,
}

impl Multiplexer {
    pub fn new(config: EngineConfig, renderer: Renderer) -> Self {
        Self {
            renderer,
            active_id: None,
            cache: HashMap::new(),
            snapshots: HashMap::new(),
            ready: false,
            requests: SwitchQueue::default(),
            known_text: HashMap::new(),
            user_switched: false,
            config,
        }
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer {
        &mut self.renderer
    }

    pub fn active_id(&self) -> Option<DocumentId> {
        self.active_id
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn cached_state(&self, id: DocumentId) -> Option<&CachedState> {
        self.cache.get(&id)
    }

    pub fn snapshot(&self, id: DocumentId) -> Option<&Snapshot> {
        self.snapshots.get(&id)
    }

    /// Renderer startup complete: serialize/capture become safe
    pub fn mark_ready(&mut self) -> Vec<HostMessage> {
        self.ready = true;
        vec![HostMessage::Ready]
    }

    /// Handle through which host callbacks deposit switch requests.
    /// Requests landing while a switch is in flight run after it commits.
    pub fn switch_requests(&self) -> SwitchQueue {
        self.requests.clone()
    }

    /// Drop cached state and snapshot when the store deletes a document
    pub fn forget_document(&mut self, id: DocumentId) {
        self.cache.remove(&id);
        self.snapshots.remove(&id);
        self.known_text.remove(&id);
        if self.active_id == Some(id) {
            self.active_id = None;
        }
    }

    /// Hand the renderer to `doc`. Strictly sequential: serialize old ->
    /// capture-prepare -> snapshot -> capture-end -> detach -> attach ->
    /// settle -> reveal. The bounded waits inside pump host callbacks,
    /// which may deposit further switch requests through [`SwitchQueue`];
    /// those are drained here only after this switch commits `active_id`,
    /// so step 1 of a later switch never starts before step 3 of the
    /// current one.
    pub fn switch_active(
        &mut self,
        pump: &mut dyn EventPump,
        surface: &mut dyn SurfaceHost,
        doc: &Document,
    ) -> Vec<HostMessage> {
        self.user_switched = true;
        let mut messages = self.run_switch(pump, surface, doc);

        while let Some(next) = self.requests.take() {
            if self.active_id == Some(next.id) {
                tracing::debug!(id = %next.id, "queued switch target already active, dropping");
                continue;
            }
            tracing::debug!(id = %next.id, "running switch queued mid-flight");
            messages.extend(self.run_switch(pump, surface, &next));
        }
        messages
    }

    fn run_switch(
        &mut self,
        pump: &mut dyn EventPump,
        surface: &mut dyn SurfaceHost,
        doc: &Document,
    ) -> Vec<HostMessage> {
        let mut messages = Vec::new();

        if self.active_id == Some(doc.id) {
            tracing::debug!(id = %doc.id, "already active, nothing to switch");
            return messages;
        }

        let previous = self.active_id;
        if let Some(old_id) = previous {
            // Step 1: serialize the old owner before anything resets its
            // selection, and propagate to the store immediately
            if self.ready {
                let state = self.renderer.serialize();
                messages.push(HostMessage::ContentChanged {
                    document_id: old_id,
                    content: state.text.clone(),
                });
                messages.push(HostMessage::RequestSave {
                    document_id: old_id,
                });
                self.cache.insert(old_id, state);
            } else {
                tracing::warn!(%old_id, "renderer not ready, skipping serialize on switch");
                messages.push(HostMessage::Log {
                    message: format!("skipped serialize of {old_id}: renderer not ready"),
                });
            }

            // Step 2: static snapshot for the window losing the surface
            let snapshot = self.capture_snapshot(pump, surface, old_id, &mut messages);
            surface.show_snapshot(&snapshot);
            self.snapshots.insert(old_id, snapshot);

            // Step 3 begins: the old owner is detached only from within
            // the new owner's attach path
            self.renderer.detach();
        }

        // Attach: cached live state supersedes the raw document record
        self.known_text.insert(doc.id, doc.text.clone());
        match self.cache.get(&doc.id) {
            Some(state) => {
                let state = state.clone();
                self.renderer.restore(&state);
            }
            None => {
                self.renderer.load_document(doc.id, &doc.text);
                self.renderer.set_selection(crate::model::Selection::new(
                    doc.selection_anchor,
                    doc.selection_head,
                ));
                self.renderer.set_scroll_top(doc.scroll_top);
            }
        }
        self.renderer.attach(doc.id);
        self.active_id = Some(doc.id);

        // Step 4: let the first paint settle, then reveal the live surface
        let frame = surface.request_frame();
        if let Err(err) = await_bounded(pump, &frame, self.config.settle(), self.config.pump_slice())
        {
            tracing::debug!(%err, "settle frame never painted, revealing anyway");
        }
        surface.reveal_live(doc.id);

        tracing::debug!(id = %doc.id, "switch committed");
        messages
    }

    /// Bounded-wait capture of the current surface for `old_id`; on any
    /// timeout falls back to a plain-text preview of the last known
    /// content so the detached window is never blank
    fn capture_snapshot(
        &mut self,
        pump: &mut dyn EventPump,
        surface: &mut dyn SurfaceHost,
        old_id: DocumentId,
        messages: &mut Vec<HostMessage>,
    ) -> Snapshot {
        if self.ready {
            self.renderer.prepare_for_capture();
            let frame = surface.request_frame();
            let painted = await_bounded(
                pump,
                &frame,
                self.config.frame_wait(),
                self.config.pump_slice(),
            );

            let pixels = painted.and_then(|()| {
                let op = surface.request_snapshot();
                await_bounded(
                    pump,
                    &op,
                    self.config.snapshot_wait(),
                    self.config.pump_slice(),
                )
            });
            self.renderer.end_capture();

            match pixels {
                Ok(pixels) => {
                    return Snapshot {
                        document_id: old_id,
                        image: SnapshotImage::Pixels(pixels),
                        captured_at: pump.now(),
                    }
                }
                Err(err) => {
                    tracing::warn!(%old_id, %err, "snapshot capture failed, using text preview");
                    messages.push(HostMessage::Error {
                        message: format!("snapshot capture for {old_id} timed out"),
                    });
                }
            }
        } else {
            tracing::warn!(%old_id, "renderer not ready, skipping pixel capture");
        }

        // Last serialized content, else the store-side content recorded at
        // attach time, else whatever the renderer is still holding
        let preview = self
            .cache
            .get(&old_id)
            .map(|state| state.text.clone())
            .or_else(|| self.known_text.get(&old_id).cloned())
            .unwrap_or_else(|| self.renderer.text());
        Snapshot {
            document_id: old_id,
            image: SnapshotImage::TextPreview(preview),
            captured_at: pump.now(),
        }
    }

    /// Populate snapshots for documents never yet shown. Runs only once
    /// `ready` and before the first user-triggered switch; the active
    /// document's state is preserved around the whole pass.
    pub fn prerender(
        &mut self,
        pump: &mut dyn EventPump,
        surface: &mut dyn SurfaceHost,
        docs: &[Document],
    ) -> Vec<HostMessage> {
        if !self.ready || self.user_switched {
            tracing::debug!(
                ready = self.ready,
                user_switched = self.user_switched,
                "prerender skipped"
            );
            return Vec::new();
        }

        let saved = self
            .renderer
            .attached()
            .map(|id| (id, self.renderer.serialize()));
        let mut messages = Vec::new();

        for doc in docs {
            if saved.as_ref().map(|(id, _)| *id) == Some(doc.id)
                || self.snapshots.contains_key(&doc.id)
            {
                continue;
            }
            // A user switch may arrive through a pumped callback
            if self.user_switched || self.requests.has_request() {
                tracing::debug!("user switch observed, aborting prerender");
                break;
            }

            self.known_text.insert(doc.id, doc.text.clone());
            self.renderer.load_document(doc.id, &doc.text);
            for _ in 0..2 {
                let frame = surface.request_frame();
                let _ = await_bounded(
                    pump,
                    &frame,
                    self.config.frame_wait(),
                    self.config.pump_slice(),
                );
            }
            let snapshot = self.capture_snapshot(pump, surface, doc.id, &mut messages);
            surface.show_snapshot(&snapshot);
            self.snapshots.insert(doc.id, snapshot);
        }

        // Put the active document back exactly as it was
        if let Some((id, state)) = saved {
            self.renderer.restore(&state);
            self.renderer.attach(id);
        } else {
            self.renderer.detach();
        }

        messages
    }
}
