use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use taskdriver::{Completion, Task};

/// Asynchronous tasks completed by hand.
///
/// Every task built here records its completion signal when started; tests
/// then release the signals in start order with [`finish_next`].
///
/// [`finish_next`]: ManualTasks::finish_next
#[derive(Clone, Default)]
pub struct ManualTasks {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    pending: VecDeque<(&'static str, Completion)>,
    started: Vec<&'static str>,
}

impl ManualTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task(&self) -> Task {
        self.labelled("task")
    }

    /// A task that records `label` when started.
    pub fn labelled(&self, label: &'static str) -> Task {
        let inner = Arc::clone(&self.inner);
        Task::asynchronous(move |done: Completion| {
            let mut inner = inner.lock().unwrap();
            inner.started.push(label);
            inner.pending.push_back((label, done));
            Ok(())
        })
    }

    /// Labels of every start so far, in order.
    pub fn started(&self) -> Vec<&'static str> {
        self.inner.lock().unwrap().started.clone()
    }

    pub fn start_count(&self) -> usize {
        self.inner.lock().unwrap().started.len()
    }

    /// Number of started tasks still waiting for completion.
    pub fn pending(&self) -> usize {
        self.inner.lock().unwrap().pending.len()
    }

    /// Remove the oldest pending signal without completing it.
    pub fn take_next(&self) -> Option<Completion> {
        self.inner.lock().unwrap().pending.pop_front().map(|(_, done)| done)
    }

    /// Complete the oldest pending task. Returns `Ok(false)` if none is
    /// pending.
    pub fn finish_next(&self) -> taskdriver::Result<bool> {
        match self.take_next() {
            Some(done) => done.complete().map(|_| true),
            None => Ok(false),
        }
    }

    /// Complete the oldest pending task labelled `label`.
    pub fn finish(&self, label: &str) -> taskdriver::Result<bool> {
        let done = {
            let mut inner = self.inner.lock().unwrap();
            let index = inner.pending.iter().position(|(l, _)| *l == label);
            index.and_then(|i| inner.pending.remove(i)).map(|(_, done)| done)
        };
        match done {
            Some(done) => done.complete().map(|_| true),
            None => Ok(false),
        }
    }
}
