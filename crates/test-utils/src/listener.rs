use std::sync::{Arc, Mutex};

use taskdriver::{Progress, TaskListener};

/// Listener that keeps every snapshot it receives.
///
/// Clones share the same history, so keep one clone and register the other.
#[derive(Clone, Default)]
pub struct RecordingListener {
    history: Arc<Mutex<Vec<Progress>>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<Progress> {
        self.history.lock().unwrap().last().copied()
    }

    pub fn notifications(&self) -> usize {
        self.history.lock().unwrap().len()
    }

    pub fn history(&self) -> Vec<Progress> {
        self.history.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.history.lock().unwrap().clear();
    }
}

impl TaskListener for RecordingListener {
    fn on_progress(&self, progress: Progress) {
        self.history.lock().unwrap().push(progress);
    }
}
