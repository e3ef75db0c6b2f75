//! Shared test helpers for integration tests
//!
//! Note: Functions may appear unused because each test file compiles separately.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

use inkpad::bridge::{EventPump, PendingOp};
use inkpad::config::EngineConfig;
use inkpad::decor::{FormulaError, FormulaRenderer, MathFragment};
use inkpad::model::{Document, DocumentId};
use inkpad::mux::{Multiplexer, Snapshot, SnapshotPixels, SurfaceHost};
use inkpad::overlay::{OverlayKind, WidgetMeasure};
use inkpad::renderer::Renderer;

/// Virtual clock shared between the fake pump and the scripted surface.
/// Completions scheduled through it fire as the pump advances time.
pub struct Clock {
    now: Cell<Instant>,
    due: RefCell<Vec<(Instant, Box<dyn FnOnce()>)>>,
}

impl Clock {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            now: Cell::new(Instant::now()),
            due: RefCell::new(Vec::new()),
        })
    }

    pub fn now(&self) -> Instant {
        self.now.get()
    }

    pub fn schedule(&self, after: Duration, f: impl FnOnce() + 'static) {
        self.due
            .borrow_mut()
            .push((self.now.get() + after, Box::new(f)));
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
        loop {
            let next = {
                let mut due = self.due.borrow_mut();
                due.iter()
                    .position(|(at, _)| *at <= self.now.get())
                    .map(|i| due.remove(i).1)
            };
            match next {
                Some(f) => f(),
                None => break,
            }
        }
    }
}

/// Event pump driven by the shared virtual clock
pub struct FakePump {
    clock: Rc<Clock>,
}

impl FakePump {
    pub fn new(clock: Rc<Clock>) -> Self {
        Self { clock }
    }
}

impl EventPump for FakePump {
    fn pump(&mut self, slice: Duration) {
        self.clock.advance(slice);
    }

    fn now(&self) -> Instant {
        self.clock.now()
    }
}

/// Scripted surface host: frames and snapshots complete after configured
/// delays (or never, when `None`), and every overlay operation is recorded
pub struct ScriptedSurface {
    clock: Rc<Clock>,
    pub frame_delay: Option<Duration>,
    pub snapshot_delay: Option<Duration>,
    pub snapshot_pixels: SnapshotPixels,
    pub frames_requested: usize,
    pub snapshots_requested: usize,
    pub shown: Vec<Snapshot>,
    pub revealed: Vec<DocumentId>,
}

impl ScriptedSurface {
    pub fn new(clock: Rc<Clock>) -> Self {
        Self {
            clock,
            frame_delay: Some(Duration::from_millis(10)),
            snapshot_delay: Some(Duration::from_millis(10)),
            snapshot_pixels: SnapshotPixels {
                width: 4,
                height: 4,
                data: vec![0xff; 64],
            },
            frames_requested: 0,
            snapshots_requested: 0,
            shown: Vec::new(),
            revealed: Vec::new(),
        }
    }
}

impl SurfaceHost for ScriptedSurface {
    fn request_frame(&mut self) -> PendingOp<()> {
        self.frames_requested += 1;
        match self.frame_delay {
            Some(delay) => {
                let (op, completion) = PendingOp::new();
                self.clock.schedule(delay, move || completion.complete(()));
                op
            }
            None => {
                let (op, _completion) = PendingOp::new();
                op
            }
        }
    }

    fn request_snapshot(&mut self) -> PendingOp<SnapshotPixels> {
        self.snapshots_requested += 1;
        match self.snapshot_delay {
            Some(delay) => {
                let (op, completion) = PendingOp::new();
                let pixels = self.snapshot_pixels.clone();
                self.clock
                    .schedule(delay, move || completion.complete(pixels));
                op
            }
            None => {
                let (op, _completion) = PendingOp::new();
                op
            }
        }
    }

    fn show_snapshot(&mut self, snapshot: &Snapshot) {
        self.shown.push(snapshot.clone());
    }

    fn reveal_live(&mut self, id: DocumentId) {
        self.revealed.push(id);
    }
}

/// Formula renderer that wraps the formula in angle-bracket markup
pub struct EchoMath;

impl FormulaRenderer for EchoMath {
    fn render(&self, formula: &str, display_mode: bool) -> Result<MathFragment, FormulaError> {
        let tag = if display_mode { "block" } else { "inline" };
        Ok(MathFragment {
            markup: format!("<{tag}>{formula}</{tag}>"),
        })
    }
}

/// Formula renderer that always fails
pub struct BrokenMath;

impl FormulaRenderer for BrokenMath {
    fn render(&self, formula: &str, _display_mode: bool) -> Result<MathFragment, FormulaError> {
        Err(FormulaError(format!("cannot render {formula}")))
    }
}

/// Widget measurer returning one fixed height for everything
pub struct FixedMeasure(pub f32);

impl WidgetMeasure for FixedMeasure {
    fn natural_height(&mut self, _kind: OverlayKind, _content: &str) -> Option<f32> {
        Some(self.0)
    }
}

pub fn test_config() -> EngineConfig {
    EngineConfig::default()
}

pub fn test_renderer() -> Renderer {
    Renderer::new(&test_config(), Box::new(EchoMath), Box::new(FixedMeasure(40.0)))
}

pub fn test_multiplexer() -> Multiplexer {
    Multiplexer::new(test_config(), test_renderer())
}

pub fn doc(id: u64, text: &str) -> Document {
    Document {
        id: DocumentId(id),
        text: text.to_string(),
        selection_anchor: 0,
        selection_head: 0,
        scroll_top: 0.0,
    }
}
