use common::{FieldSnapshot, GamePhase};
use std::sync::{Arc, Mutex};

/// What the presentation asks of the game loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Start,
    Quit,
    Key(String),
}

#[derive(Debug, Clone, Default)]
pub struct ViewSnapshot {
    /// `None` until the first engine state has been fetched.
    pub phase: Option<GamePhase>,
    pub field: Arc<FieldSnapshot>,
    pub score: u32,
    pub error: Option<String>,
}

/// Written by the game loop, read by the presentation. Phase and field are
/// always replaced under the same lock so a reader never sees one without
/// the other.
#[derive(Clone, Default)]
pub struct ViewState {
    inner: Arc<Mutex<ViewSnapshot>>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, field: FieldSnapshot, phase: GamePhase) {
        let mut view = self.inner.lock().unwrap();
        view.field = Arc::new(field);
        view.phase = Some(phase);
    }

    /// Like `publish`, but also zeroes the score so a fresh board is never
    /// shown next to the previous run's result.
    pub fn publish_new_run(&self, field: FieldSnapshot, phase: GamePhase) {
        let mut view = self.inner.lock().unwrap();
        view.field = Arc::new(field);
        view.phase = Some(phase);
        view.score = 0;
    }

    pub fn publish_phase(&self, phase: GamePhase) {
        self.inner.lock().unwrap().phase = Some(phase);
    }

    pub fn publish_score(&self, score: u32) {
        self.inner.lock().unwrap().score = score;
    }

    pub fn set_error(&self, error: String) {
        self.inner.lock().unwrap().error = Some(error);
    }

    pub fn clear_error(&self) {
        self.inner.lock().unwrap().error = None;
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        self.inner.lock().unwrap().clone()
    }
}
