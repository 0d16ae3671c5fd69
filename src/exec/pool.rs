// src/exec/pool.rs

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::errors::{Result, TaskDriverError};
use crate::guard::Completion;
use crate::task::{AsyncTask, SyncTask, Task};

/// Runs a synchronous task on a `tokio` runtime's blocking thread pool.
///
/// From the driver's point of view this is an asynchronous task: starting it
/// only hands the body to the pool, and the completion signal fires on the
/// pool thread once the body returns. A failing body has no caller to
/// report to, so the failure is logged and the task still completes.
#[derive(Clone)]
pub struct SpawnBlockingTask {
    task: Arc<dyn SyncTask>,
    handle: Handle,
}

impl SpawnBlockingTask {
    pub fn new<F>(body: F, handle: Handle) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::from_task(Arc::new(body), handle)
    }

    pub fn from_task(task: Arc<dyn SyncTask>, handle: Handle) -> Self {
        Self { task, handle }
    }

    /// Use the runtime the caller is currently inside.
    pub fn current<F>(body: F) -> Result<Self>
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let handle = Handle::try_current().map_err(|err| {
            TaskDriverError::ContractViolation(format!("no tokio runtime available: {err}"))
        })?;
        Ok(Self::new(body, handle))
    }
}

impl AsyncTask for SpawnBlockingTask {
    fn start(&self, done: Completion) -> anyhow::Result<()> {
        let task = Arc::clone(&self.task);
        debug!("handing task to blocking pool");
        self.handle.spawn_blocking(move || {
            if let Err(err) = task.run() {
                warn!(error = %err, "pooled task failed");
            }
            if let Err(err) = done.complete() {
                warn!(error = %err, "task admitted after pooled completion failed");
            }
        });
        Ok(())
    }
}

impl From<SpawnBlockingTask> for Task {
    fn from(task: SpawnBlockingTask) -> Self {
        Task::from_async(task)
    }
}

impl fmt::Debug for SpawnBlockingTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpawnBlockingTask").finish_non_exhaustive()
    }
}
