// src/driver/mod.rs

//! The task driver: admission control over two lanes of queued tasks.
//!
//! The driver owns no threads. Every public operation runs synchronously on
//! the caller's thread:
//! - it updates [`DriverState`](state::DriverState) under a single lock,
//! - then "drains": starts queued tasks while not suspended and under the
//!   limit, priority lane first,
//! - then notifies listeners once with the resulting [`Progress`].
//!
//! Tasks and listeners are always invoked with the lock released, so they
//! may call back into the driver. Completion signals may arrive from any
//! thread.

pub mod listeners;
pub mod queue;
mod reentry;
pub(crate) mod state;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, warn};

use crate::config::ConfigFile;
use crate::errors::{Result, TaskDriverError};
use crate::guard::Completion;
use crate::task::{AsyncTask, Batch, NotifyingTaskBatch, Task, TaskBatch};
use crate::types::Limit;

pub use listeners::{ListenerId, Progress, TaskListener};
pub use queue::PriorityEntry;
use reentry::DrainScope;
use state::DriverState;

/// Cooperative scheduler bounding how many tasks run at once.
///
/// Cloning yields another handle to the same driver.
#[derive(Clone)]
pub struct TaskDriver {
    inner: Arc<DriverInner>,
}

struct DriverInner {
    state: Mutex<DriverState>,
}

impl TaskDriver {
    /// An unbounded, running driver.
    pub fn new() -> Self {
        Self::with_limit(Limit::Unbounded)
    }

    pub fn with_limit(limit: Limit) -> Self {
        Self::from_state(DriverState::new(limit, false))
    }

    /// Build a driver from validated configuration.
    pub fn from_config(cfg: &ConfigFile) -> Self {
        debug!(
            limit = %cfg.driver.limit,
            start_suspended = cfg.driver.start_suspended,
            "building task driver from config"
        );
        Self::from_state(DriverState::new(cfg.driver.limit, cfg.driver.start_suspended))
    }

    fn from_state(state: DriverState) -> Self {
        Self {
            inner: Arc::new(DriverInner {
                state: Mutex::new(state),
            }),
        }
    }

    // ---------------------------------------------------------------------
    // Submission
    // ---------------------------------------------------------------------

    /// Queue `task` in the FIFO lane and drain.
    ///
    /// Returns the failure of any task started by this call. A synchronous
    /// task is counted as finished before its failure is returned.
    ///
    /// Called from inside a running task, this admits and starts work on
    /// the same stack before returning, so consecutive synchronous tasks nest
    /// one call frame each.
    pub fn submit(&self, task: impl Into<Task>) -> Result<()> {
        self.submit_all([task.into()])
    }

    /// Queue `task` in the priority lane (lower value first) and drain.
    pub fn submit_with_priority(&self, priority: i32, task: impl Into<Task>) -> Result<()> {
        self.submit_all_with_priority(priority, [task.into()])
    }

    /// Queue several tasks in the FIFO lane, in order, with a single drain.
    pub fn submit_all<I>(&self, tasks: I) -> Result<()>
    where
        I: IntoIterator<Item = Task>,
    {
        let queued = {
            let mut state = self.lock();
            let before = state.queue.len();
            for task in tasks {
                state.queue.push(task.into_async());
            }
            state.queue.len() - before
        };
        debug!(queued, lane = "fifo", "tasks submitted");
        self.drain()
    }

    /// Queue several tasks in the priority lane with a single drain.
    pub fn submit_all_with_priority<I>(&self, priority: i32, tasks: I) -> Result<()>
    where
        I: IntoIterator<Item = Task>,
    {
        let queued = {
            let mut state = self.lock();
            let before = state.queue.len();
            for task in tasks {
                state.queue.push_with_priority(priority, task.into_async());
            }
            state.queue.len() - before
        };
        debug!(queued, priority, lane = "priority", "tasks submitted");
        self.drain()
    }

    /// Queue a snapshot of `batch` in the FIFO lane, preserving its order.
    pub fn submit_batch<B: Batch + ?Sized>(&self, batch: &B) -> Result<()> {
        self.submit_all(batch.snapshot())
    }

    /// Submit `tasks` as a one-off batch and call `notify` once they have
    /// all completed.
    pub fn submit_notifying<I, F>(&self, tasks: I, notify: F) -> Result<()>
    where
        I: IntoIterator<Item = Task>,
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        let batch = NotifyingTaskBatch::with_tasks(notify, TaskBatch::from_tasks(tasks));
        self.submit_batch(&batch)
    }

    // ---------------------------------------------------------------------
    // Control
    // ---------------------------------------------------------------------

    /// Replace the admission limit and drain. Lowering it never preempts
    /// running tasks.
    pub fn set_limit(&self, limit: Limit) -> Result<()> {
        self.lock().limit = limit;
        debug!(%limit, "limit changed");
        self.drain()
    }

    /// Stop admitting tasks. Running and queued tasks are left alone.
    pub fn suspend(&self) {
        self.lock().suspended = true;
        debug!("driver suspended");
    }

    /// Suspend, and call `on_idle` once no task is running.
    ///
    /// If nothing is running, `on_idle` runs before this returns. Otherwise
    /// a temporary listener calls it on the first notification that reports
    /// zero running tasks, then removes itself.
    pub fn suspend_then<F>(&self, on_idle: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let on_idle: Box<dyn FnOnce() + Send> = Box::new(on_idle);
        let immediate = {
            let mut state = self.lock();
            state.suspended = true;
            if state.running() == 0 {
                Some(on_idle)
            } else {
                let driver = Arc::downgrade(&self.inner);
                state.listeners.insert_with(|id| {
                    Arc::new(IdleWatcher {
                        id,
                        driver,
                        on_idle: Mutex::new(Some(on_idle)),
                    })
                });
                None
            }
        };

        match immediate {
            Some(on_idle) => {
                debug!("driver suspended while idle");
                on_idle();
            }
            None => debug!("driver suspended; waiting for running tasks"),
        }
    }

    /// Allow admissions again and drain.
    pub fn resume(&self) -> Result<()> {
        self.lock().suspended = false;
        debug!("driver resumed");
        self.drain()
    }

    /// Discard every task that has not started yet. Returns how many were
    /// discarded.
    pub fn clear_queue(&self) -> usize {
        let dropped = self.lock().queue.clear();
        debug!(dropped, "queue cleared");
        self.notify_listeners();
        dropped
    }

    // ---------------------------------------------------------------------
    // Listeners
    // ---------------------------------------------------------------------

    pub fn add_listener<L: TaskListener + 'static>(&self, listener: L) -> ListenerId {
        let mut state = self.lock();
        let id = state.listeners.add(Arc::new(listener));
        debug!(listener = ?id, listeners = state.listeners.len(), "listener added");
        id
    }

    /// Returns whether a listener was removed. Safe to call from within the
    /// listener's own callback.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.lock().listeners.remove(id)
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    pub fn queued_count(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn running_count(&self) -> usize {
        self.lock().running()
    }

    pub fn finished_count(&self) -> usize {
        self.lock().finished
    }

    pub fn is_suspended(&self) -> bool {
        self.lock().suspended
    }

    pub fn limit(&self) -> Limit {
        self.lock().limit
    }

    /// All three counters read under one lock.
    pub fn progress(&self) -> Progress {
        self.lock().progress()
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    /// State mutations are short and panic-free, so a poisoned lock still
    /// holds consistent state.
    fn lock(&self) -> MutexGuard<'_, DriverState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Admit as many tasks as possible, then notify listeners once.
    ///
    /// A drain nested inside a running task (a submit or an inline
    /// completion) admits on its own and returns failures to its own caller.
    /// Only the outermost drain on this thread notifies listeners.
    fn drain(&self) -> Result<()> {
        let scope = DrainScope::enter(Arc::as_ptr(&self.inner) as usize);
        let outcome = self.admit_ready();
        let outermost = scope.is_outermost();
        drop(scope);

        if outermost {
            self.notify_listeners();
        }
        outcome
    }

    fn admit_ready(&self) -> Result<()> {
        loop {
            let next = self.lock().next_admission();
            let Some(task) = next else {
                return Ok(());
            };

            debug!("starting task");
            if let Err(err) = task.start(self.completion_for_admitted()) {
                let err = TaskDriverError::from_task(err);
                warn!(error = %err, queued = self.queued_count(), "task failed; drain stopped");
                return Err(err);
            }
        }
    }

    /// The completion signal handed to an admitted task. It only holds a
    /// weak reference so an abandoned task does not keep the driver alive.
    fn completion_for_admitted(&self) -> Completion {
        let driver = Arc::downgrade(&self.inner);
        Completion::new(move || match driver.upgrade() {
            Some(inner) => TaskDriver { inner }.on_task_done(),
            None => {
                warn!("task completed after its driver was dropped");
                Ok(())
            }
        })
    }

    fn on_task_done(&self) -> Result<()> {
        let counted = self.lock().record_finished();
        if !counted {
            return Err(TaskDriverError::ContractViolation(
                "more completions than started tasks".to_string(),
            ));
        }
        debug!("task finished");
        self.drain()
    }

    fn notify_listeners(&self) {
        let (listeners, progress) = {
            let state = self.lock();
            (state.listeners.snapshot(), state.progress())
        };
        if listeners.is_empty() {
            return;
        }
        for listener in listeners {
            listener.on_progress(progress);
        }
    }
}

impl Default for TaskDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TaskDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("TaskDriver")
            .field("progress", &state.progress())
            .field("suspended", &state.suspended)
            .field("limit", &state.limit)
            .finish()
    }
}

/// Temporary listener behind [`TaskDriver::suspend_then`].
struct IdleWatcher {
    id: ListenerId,
    driver: Weak<DriverInner>,
    on_idle: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl TaskListener for IdleWatcher {
    fn on_progress(&self, progress: Progress) {
        if !progress.is_idle() {
            return;
        }
        let on_idle = self
            .on_idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(on_idle) = on_idle else {
            return;
        };

        if let Some(inner) = self.driver.upgrade() {
            TaskDriver { inner }.remove_listener(self.id);
        }
        debug!("driver idle after suspend");
        on_idle();
    }
}
