// src/task/mod.rs

//! Task abstraction and combinators.
//!
//! A [`Task`] is either synchronous (done when its body returns) or
//! asynchronous (done when it invokes its [`Completion`]). Everything that
//! schedules tasks converts to the asynchronous shape at the boundary via
//! [`Task::into_async`], so the driver only ever deals with one shape.
//!
//! - [`notifying`] adds completion subscriptions to a task.
//! - [`batch`] holds ordered, reusable task lists and the joining variant.
//! - [`dependent`] defers submission until other tasks complete.
//! - [`repeating`] re-runs an inner task until stopped or a limit is hit.

pub mod batch;
pub mod dependent;
pub mod notifying;
pub mod repeating;

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::errors::{Result, TaskDriverError};
use crate::guard::Completion;

pub use batch::{Batch, NotifyingTaskBatch, TaskBatch};
pub use dependent::DependentTask;
pub use notifying::NotifyingTask;
pub use repeating::RepeatingTask;

/// A unit of work that is done once `run` returns, successfully or not.
pub trait SyncTask: Send + Sync {
    fn run(&self) -> anyhow::Result<()>;
}

impl<F> SyncTask for F
where
    F: Fn() -> anyhow::Result<()> + Send + Sync,
{
    fn run(&self) -> anyhow::Result<()> {
        self()
    }
}

/// A unit of work that is done once it invokes `done`.
///
/// Implementations must make sure `done` is eventually completed on every
/// exit path, including failures. An error returned from `start` *before*
/// `done` is completed leaves the task counted as running forever.
pub trait AsyncTask: Send + Sync {
    fn start(&self, done: Completion) -> anyhow::Result<()>;
}

impl<F> AsyncTask for F
where
    F: Fn(Completion) -> anyhow::Result<()> + Send + Sync,
{
    fn start(&self, done: Completion) -> anyhow::Result<()> {
        self(done)
    }
}

/// Either shape of task. Cloning shares the underlying body.
#[derive(Clone)]
pub enum Task {
    Sync(Arc<dyn SyncTask>),
    Async(Arc<dyn AsyncTask>),
}

impl Task {
    /// A synchronous task from a closure.
    pub fn synchronous<F>(body: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Task::Sync(Arc::new(body))
    }

    /// An asynchronous task from a closure receiving its completion signal.
    pub fn asynchronous<F>(body: F) -> Self
    where
        F: Fn(Completion) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Task::Async(Arc::new(body))
    }

    pub fn from_sync<T: SyncTask + 'static>(task: T) -> Self {
        Task::Sync(Arc::new(task))
    }

    pub fn from_async<T: AsyncTask + 'static>(task: T) -> Self {
        Task::Async(Arc::new(task))
    }

    pub fn is_synchronous(&self) -> bool {
        matches!(self, Task::Sync(_))
    }

    /// Convert to the asynchronous shape. A synchronous body completes its
    /// signal right after returning, even when it failed.
    pub fn into_async(self) -> Arc<dyn AsyncTask> {
        match self {
            Task::Sync(body) => Arc::new(SyncAsAsync(body)),
            Task::Async(task) => task,
        }
    }

    /// Start this task with the given completion signal.
    pub fn start(&self, done: Completion) -> Result<()> {
        match self {
            Task::Sync(body) => run_then_complete(body.as_ref(), &done),
            Task::Async(task) => task.start(done).map_err(TaskDriverError::from_task),
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Sync(_) => f.write_str("Task::Sync(..)"),
            Task::Async(_) => f.write_str("Task::Async(..)"),
        }
    }
}

struct SyncAsAsync(Arc<dyn SyncTask>);

impl AsyncTask for SyncAsAsync {
    fn start(&self, done: Completion) -> anyhow::Result<()> {
        run_then_complete(self.0.as_ref(), &done).map_err(anyhow::Error::from)
    }
}

/// Run a synchronous body and complete `done` afterwards regardless of the
/// outcome. The body's own failure takes precedence over a failure raised
/// by the completion.
fn run_then_complete(body: &dyn SyncTask, done: &Completion) -> Result<()> {
    let outcome = body.run().map_err(TaskDriverError::from_task);
    let completed = done.complete();

    match (outcome, completed) {
        (Err(err), Err(also)) => {
            warn!(error = %also, "completion failed after task body already failed");
            Err(err)
        }
        (outcome, completed) => outcome.and(completed),
    }
}
