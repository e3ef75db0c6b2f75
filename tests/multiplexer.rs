//! Integration tests for the surface multiplexer: switch sequencing,
//! snapshot fallback, cache isolation, pre-rendering and ready gating.

mod common;

use std::time::Duration;

use inkpad::bridge::HostMessage;
use inkpad::model::{DocumentId, Selection};
use inkpad::mux::SnapshotImage;

use common::{doc, test_multiplexer, Clock, FakePump, ScriptedSurface};

#[test]
fn test_mark_ready_emits_ready_message() {
    let mut mux = test_multiplexer();
    assert!(!mux.is_ready());

    let messages = mux.mark_ready();
    assert!(mux.is_ready());
    assert_eq!(messages, vec![HostMessage::Ready]);
}

#[test]
fn test_first_switch_attaches_without_propagation() {
    let clock = Clock::new();
    let mut pump = FakePump::new(clock.clone());
    let mut surface = ScriptedSurface::new(clock);
    let mut mux = test_multiplexer();
    mux.mark_ready();

    let a = doc(1, "# Notes\n\nfirst document\n");
    let messages = mux.switch_active(&mut pump, &mut surface, &a);

    // Nothing to serialize or capture: no prior owner
    assert!(messages.is_empty());
    assert_eq!(mux.active_id(), Some(DocumentId(1)));
    assert_eq!(mux.renderer().attached(), Some(DocumentId(1)));
    assert_eq!(mux.renderer().text(), "# Notes\n\nfirst document\n");
    assert_eq!(surface.revealed, vec![DocumentId(1)]);
    assert!(surface.shown.is_empty());
}

#[test]
fn test_switch_serializes_old_owner_before_reset() {
    let clock = Clock::new();
    let mut pump = FakePump::new(clock.clone());
    let mut surface = ScriptedSurface::new(clock.clone());
    let mut mux = test_multiplexer();
    mux.mark_ready();

    let a = doc(1, "alpha\n");
    let b = doc(2, "beta\n");
    mux.switch_active(&mut pump, &mut surface, &a);

    // User edits document A, caret lands mid-text
    mux.renderer_mut().insert(5, " one", clock.now());
    mux.renderer_mut().set_selection(Selection::collapsed(3));
    let expected = mux.renderer().serialize();

    let messages = mux.switch_active(&mut pump, &mut surface, &b);

    // Cache holds exactly the state from before capture reset the selection
    let cached = mux.cached_state(DocumentId(1)).cloned();
    assert_eq!(cached.as_ref(), Some(&expected));
    assert_eq!(cached.as_ref().map(|s| s.selection_head), Some(3));

    // The store learns the content synchronously, before any save
    assert_eq!(
        messages[0],
        HostMessage::ContentChanged {
            document_id: DocumentId(1),
            content: "alpha one\n".to_string(),
        }
    );
    assert_eq!(
        messages[1],
        HostMessage::RequestSave {
            document_id: DocumentId(1),
        }
    );

    assert_eq!(mux.active_id(), Some(DocumentId(2)));
    assert_eq!(mux.renderer().text(), "beta\n");
}

#[test]
fn test_switch_captures_pixel_snapshot_of_old_owner() {
    let clock = Clock::new();
    let mut pump = FakePump::new(clock.clone());
    let mut surface = ScriptedSurface::new(clock);
    let mut mux = test_multiplexer();
    mux.mark_ready();

    mux.switch_active(&mut pump, &mut surface, &doc(1, "alpha\n"));
    mux.switch_active(&mut pump, &mut surface, &doc(2, "beta\n"));

    let snapshot = mux.snapshot(DocumentId(1)).cloned();
    let snapshot = match snapshot {
        Some(s) => s,
        None => panic!("no snapshot captured for the detached document"),
    };
    assert_eq!(snapshot.document_id, DocumentId(1));
    assert_eq!(
        snapshot.image,
        SnapshotImage::Pixels(surface.snapshot_pixels.clone())
    );
    // The overlay was installed for the old owner before reveal of the new
    assert_eq!(surface.shown.len(), 1);
    assert_eq!(surface.shown[0].document_id, DocumentId(1));
    assert_eq!(surface.revealed, vec![DocumentId(1), DocumentId(2)]);
}

#[test]
fn test_snapshot_timeout_falls_back_to_text_preview() {
    let clock = Clock::new();
    let mut pump = FakePump::new(clock.clone());
    let mut surface = ScriptedSurface::new(clock.clone());
    // Pixel capture never completes
    surface.snapshot_delay = None;
    let mut mux = test_multiplexer();
    mux.mark_ready();

    mux.switch_active(&mut pump, &mut surface, &doc(1, "alpha\n"));
    mux.renderer_mut().insert(5, " edited", clock.now());

    let start = clock.now();
    let messages = mux.switch_active(&mut pump, &mut surface, &doc(2, "beta\n"));

    // Bounded wait: the 100ms snapshot budget was spent, not an unbounded block
    assert!(clock.now() - start >= Duration::from_millis(100));

    // The detached window shows the last known content, never a blank
    let snapshot = mux.snapshot(DocumentId(1)).cloned();
    assert_eq!(
        snapshot.map(|s| s.image),
        Some(SnapshotImage::TextPreview("alpha edited\n".to_string()))
    );
    assert!(messages
        .iter()
        .any(|m| matches!(m, HostMessage::Error { .. })));
    // The switch itself still completed
    assert_eq!(mux.active_id(), Some(DocumentId(2)));
    assert_eq!(*surface.revealed.last().unwrap(), DocumentId(2));
}

#[test]
fn test_switch_back_restores_cached_state_exactly() {
    let clock = Clock::new();
    let mut pump = FakePump::new(clock.clone());
    let mut surface = ScriptedSurface::new(clock.clone());
    let mut mux = test_multiplexer();
    mux.mark_ready();

    let a = doc(1, "alpha\n");
    let b = doc(2, "beta\n");
    mux.switch_active(&mut pump, &mut surface, &a);
    mux.renderer_mut().insert(5, " more", clock.now());
    mux.renderer_mut().set_selection(Selection::new(2, 7));
    mux.renderer_mut().set_scroll_top(120.0);
    let before = mux.renderer().serialize();

    mux.switch_active(&mut pump, &mut surface, &b);
    mux.switch_active(&mut pump, &mut surface, &a);

    assert_eq!(mux.renderer().serialize(), before);
    assert_eq!(mux.renderer().attached(), Some(DocumentId(1)));
}

#[test]
fn test_rapid_switch_chain_keeps_caches_isolated() {
    let clock = Clock::new();
    let mut pump = FakePump::new(clock.clone());
    let mut surface = ScriptedSurface::new(clock.clone());
    let mut mux = test_multiplexer();
    mux.mark_ready();

    mux.switch_active(&mut pump, &mut surface, &doc(1, "alpha\n"));
    mux.renderer_mut().insert(0, "A:", clock.now());
    mux.switch_active(&mut pump, &mut surface, &doc(2, "beta\n"));
    mux.renderer_mut().insert(0, "B:", clock.now());
    mux.switch_active(&mut pump, &mut surface, &doc(3, "gamma\n"));

    assert_eq!(mux.cached_state(DocumentId(1)).unwrap().text, "A:alpha\n");
    assert_eq!(mux.cached_state(DocumentId(2)).unwrap().text, "B:beta\n");
    assert_eq!(mux.renderer().text(), "gamma\n");
}

#[test]
fn test_switch_while_not_ready_skips_serialize_and_capture() {
    let clock = Clock::new();
    let mut pump = FakePump::new(clock.clone());
    let mut surface = ScriptedSurface::new(clock);
    let mut mux = test_multiplexer();
    // mark_ready never called

    mux.switch_active(&mut pump, &mut surface, &doc(1, "alpha\n"));
    let messages = mux.switch_active(&mut pump, &mut surface, &doc(2, "beta\n"));

    // No serialize happened, so no propagation and no cache entry
    assert!(!messages
        .iter()
        .any(|m| matches!(m, HostMessage::ContentChanged { .. })));
    assert!(mux.cached_state(DocumentId(1)).is_none());
    assert_eq!(surface.snapshots_requested, 0);

    // The detached window still gets a stand-in from the renderer's content
    let snapshot = mux.snapshot(DocumentId(1)).cloned();
    assert_eq!(
        snapshot.map(|s| s.image),
        Some(SnapshotImage::TextPreview("alpha\n".to_string()))
    );
}

#[test]
fn test_switch_to_already_active_document_is_a_no_op() {
    let clock = Clock::new();
    let mut pump = FakePump::new(clock.clone());
    let mut surface = ScriptedSurface::new(clock.clone());
    let mut mux = test_multiplexer();
    mux.mark_ready();

    let a = doc(1, "alpha\n");
    mux.switch_active(&mut pump, &mut surface, &a);
    mux.renderer_mut().insert(0, "X", clock.now());

    let messages = mux.switch_active(&mut pump, &mut surface, &a);
    assert!(!messages
        .iter()
        .any(|m| matches!(m, HostMessage::ContentChanged { .. })));
    // The live buffer was not clobbered by a reload
    assert_eq!(mux.renderer().text(), "Xalpha\n");
}

#[test]
fn test_prerender_populates_snapshots_for_unseen_documents() {
    let clock = Clock::new();
    let mut pump = FakePump::new(clock.clone());
    let mut surface = ScriptedSurface::new(clock.clone());
    let mut mux = test_multiplexer();
    mux.mark_ready();

    let docs = vec![doc(1, "alpha\n"), doc(2, "beta\n")];
    mux.prerender(&mut pump, &mut surface, &docs);

    for id in [DocumentId(1), DocumentId(2)] {
        let snapshot = mux.snapshot(id).cloned();
        assert_eq!(
            snapshot.map(|s| s.image),
            Some(SnapshotImage::Pixels(surface.snapshot_pixels.clone()))
        );
    }
    // No document was ever active, so the renderer ends up unattached
    assert_eq!(mux.renderer().attached(), None);
}

#[test]
fn test_prerender_preserves_active_document_state() {
    let clock = Clock::new();
    let mut pump = FakePump::new(clock.clone());
    let mut surface = ScriptedSurface::new(clock.clone());
    let mut mux = test_multiplexer();
    mux.mark_ready();

    // Attach the first document without going through a user switch
    mux.renderer_mut().load_document(DocumentId(1), "alpha\n");
    mux.renderer_mut().insert(5, "!", clock.now());
    let before = mux.renderer().serialize();

    mux.prerender(&mut pump, &mut surface, &[doc(2, "beta\n")]);

    assert!(mux.snapshot(DocumentId(2)).is_some());
    assert_eq!(mux.renderer().serialize(), before);
}

#[test]
fn test_prerender_refuses_to_run_after_user_switch() {
    let clock = Clock::new();
    let mut pump = FakePump::new(clock.clone());
    let mut surface = ScriptedSurface::new(clock.clone());
    let mut mux = test_multiplexer();
    mux.mark_ready();

    mux.switch_active(&mut pump, &mut surface, &doc(1, "alpha\n"));
    let frames = surface.frames_requested;

    mux.prerender(&mut pump, &mut surface, &[doc(2, "beta\n")]);
    assert!(mux.snapshot(DocumentId(2)).is_none());
    assert_eq!(surface.frames_requested, frames);
}

#[test]
fn test_prerender_requires_ready() {
    let clock = Clock::new();
    let mut pump = FakePump::new(clock.clone());
    let mut surface = ScriptedSurface::new(clock.clone());
    let mut mux = test_multiplexer();

    mux.prerender(&mut pump, &mut surface, &[doc(1, "alpha\n")]);
    assert!(mux.snapshot(DocumentId(1)).is_none());
    assert_eq!(surface.frames_requested, 0);
}

#[test]
fn test_switch_requested_mid_flight_runs_after_commit() {
    let clock = Clock::new();
    let mut pump = FakePump::new(clock.clone());
    let mut surface = ScriptedSurface::new(clock.clone());
    let mut mux = test_multiplexer();
    mux.mark_ready();

    mux.switch_active(&mut pump, &mut surface, &doc(1, "alpha\n"));

    // A focus change lands on the event loop while the A->B switch is
    // mid-capture: the callback deposits the request, never calls in
    let queue = mux.switch_requests();
    let gamma = doc(3, "gamma\n");
    clock.schedule(Duration::from_millis(5), move || queue.request(gamma));

    let messages = mux.switch_active(&mut pump, &mut surface, &doc(2, "beta\n"));

    // The queued switch ran, but only after B committed as the owner
    assert_eq!(mux.active_id(), Some(DocumentId(3)));
    assert_eq!(
        surface.revealed,
        vec![DocumentId(1), DocumentId(2), DocumentId(3)]
    );
    // Both detached documents were serialized against their own content
    assert_eq!(mux.cached_state(DocumentId(1)).unwrap().text, "alpha\n");
    assert_eq!(mux.cached_state(DocumentId(2)).unwrap().text, "beta\n");

    let changed: Vec<DocumentId> = messages
        .iter()
        .filter_map(|m| match m {
            HostMessage::ContentChanged { document_id, .. } => Some(*document_id),
            _ => None,
        })
        .collect();
    assert_eq!(changed, vec![DocumentId(1), DocumentId(2)]);
}

#[test]
fn test_request_for_now_active_document_is_discarded() {
    let clock = Clock::new();
    let mut pump = FakePump::new(clock.clone());
    let mut surface = ScriptedSurface::new(clock.clone());
    let mut mux = test_multiplexer();
    mux.mark_ready();

    mux.switch_active(&mut pump, &mut surface, &doc(1, "alpha\n"));

    // The mid-flight request targets the document being switched to
    let queue = mux.switch_requests();
    let beta = doc(2, "beta\n");
    clock.schedule(Duration::from_millis(5), move || queue.request(beta));

    mux.switch_active(&mut pump, &mut surface, &doc(2, "beta\n"));

    assert_eq!(mux.active_id(), Some(DocumentId(2)));
    assert!(!mux.switch_requests().has_request());
    // No third switch ran
    assert_eq!(surface.revealed, vec![DocumentId(1), DocumentId(2)]);
}

#[test]
fn test_prerender_aborts_when_a_switch_request_arrives() {
    let clock = Clock::new();
    let mut pump = FakePump::new(clock.clone());
    let mut surface = ScriptedSurface::new(clock.clone());
    let mut mux = test_multiplexer();
    mux.mark_ready();

    // Request lands during the first document's frame waits
    let queue = mux.switch_requests();
    let beta = doc(2, "beta\n");
    clock.schedule(Duration::from_millis(5), move || queue.request(beta));

    let docs = vec![doc(1, "alpha\n"), doc(3, "gamma\n")];
    mux.prerender(&mut pump, &mut surface, &docs);

    // The second document was never touched
    assert!(mux.snapshot(DocumentId(3)).is_none());
    assert!(mux.switch_requests().has_request());
}

#[test]
fn test_preview_uses_store_content_when_renderer_diverges() {
    let clock = Clock::new();
    let mut pump = FakePump::new(clock.clone());
    let mut surface = ScriptedSurface::new(clock.clone());
    // Not ready: no serialize, no pixel capture
    surface.snapshot_delay = None;
    let mut mux = test_multiplexer();

    mux.switch_active(&mut pump, &mut surface, &doc(1, "alpha\n"));
    // Host-side startup churn clobbers the renderer buffer directly
    mux.renderer_mut().load_document(DocumentId(9), "");

    mux.switch_active(&mut pump, &mut surface, &doc(2, "beta\n"));

    // The stand-in comes from document 1's store record, never the
    // unrelated (empty) buffer contents
    let snapshot = mux.snapshot(DocumentId(1)).cloned();
    assert_eq!(
        snapshot.map(|s| s.image),
        Some(SnapshotImage::TextPreview("alpha\n".to_string()))
    );
}

#[test]
fn test_forget_document_drops_cache_and_snapshot() {
    let clock = Clock::new();
    let mut pump = FakePump::new(clock.clone());
    let mut surface = ScriptedSurface::new(clock.clone());
    let mut mux = test_multiplexer();
    mux.mark_ready();

    mux.switch_active(&mut pump, &mut surface, &doc(1, "alpha\n"));
    mux.switch_active(&mut pump, &mut surface, &doc(2, "beta\n"));
    assert!(mux.cached_state(DocumentId(1)).is_some());
    assert!(mux.snapshot(DocumentId(1)).is_some());

    mux.forget_document(DocumentId(1));
    assert!(mux.cached_state(DocumentId(1)).is_none());
    assert!(mux.snapshot(DocumentId(1)).is_none());

    // Switching back now reloads from the store record
    mux.switch_active(&mut pump, &mut surface, &doc(1, "alpha v2\n"));
    assert_eq!(mux.renderer().text(), "alpha v2\n");
}
