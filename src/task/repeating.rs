// src/task/repeating.rs

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::debug;

use super::{AsyncTask, Task};
use crate::errors::Result;
use crate::guard::Completion;
use crate::types::Limit;

/// Re-runs an inner task until stopped or until it has completed `limit`
/// times, then completes itself.
///
/// Each run starts from inside the previous run's completion, so a
/// synchronous inner task repeats recursively on the caller's stack. Keep
/// bounded repeats of synchronous work small, or make the inner task
/// asynchronous.
#[derive(Clone)]
pub struct RepeatingTask {
    inner: Arc<RepeatingInner>,
}

struct RepeatingInner {
    task: Arc<dyn AsyncTask>,
    limit: Limit,
    count: AtomicUsize,
    stopped: AtomicBool,
}

impl RepeatingTask {
    /// Repeat until [`stop`](Self::stop) is called.
    pub fn new(task: impl Into<Task>) -> Self {
        Self::with_limit(task, Limit::Unbounded)
    }

    /// Repeat at most `times` runs. Fails if `times < 1`.
    pub fn bounded(task: impl Into<Task>, times: i64) -> Result<Self> {
        Ok(Self::with_limit(task, Limit::bounded(times)?))
    }

    pub fn with_limit(task: impl Into<Task>, limit: Limit) -> Self {
        Self {
            inner: Arc::new(RepeatingInner {
                task: task.into().into_async(),
                limit,
                count: AtomicUsize::new(0),
                stopped: AtomicBool::new(false),
            }),
        }
    }

    /// Stop after the current run. Latching.
    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);
    }

    /// Number of inner runs that have completed so far.
    pub fn completed_runs(&self) -> usize {
        self.inner.count.load(Ordering::SeqCst)
    }
}

impl RepeatingInner {
    fn run_once(self: &Arc<Self>, outer: Completion) -> anyhow::Result<()> {
        let this = Arc::clone(self);
        self.task
            .start(Completion::new(move || this.on_inner_done(&outer)))
    }

    fn on_inner_done(self: &Arc<Self>, outer: &Completion) -> Result<()> {
        let runs = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        if self.stopped.load(Ordering::SeqCst) || !self.limit.greater_than(runs) {
            debug!(runs, limit = %self.limit, "repeating task done");
            outer.complete()
        } else {
            self.run_once(outer.clone())
                .map_err(crate::errors::TaskDriverError::from_task)
        }
    }
}

impl AsyncTask for RepeatingTask {
    fn start(&self, done: Completion) -> anyhow::Result<()> {
        self.inner.run_once(done)
    }
}

impl From<RepeatingTask> for Task {
    fn from(task: RepeatingTask) -> Self {
        Task::from_async(task)
    }
}

impl fmt::Debug for RepeatingTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepeatingTask")
            .field("limit", &self.inner.limit)
            .field("completed_runs", &self.completed_runs())
            .field("stopped", &self.inner.stopped.load(Ordering::SeqCst))
            .finish()
    }
}
