// src/exec/blocking.rs

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender};
use tracing::debug;

use crate::errors::{Result, TaskDriverError};
use crate::guard::Completion;
use crate::task::Task;

#[derive(Debug)]
enum Signal {
    Completed,
    Abandoned,
}

/// Start `task` on this thread and block until it signals completion.
///
/// Must not be called from inside an async runtime worker.
pub fn block_on_task(task: &Task) -> Result<()> {
    BlockingWait::new().wait(task)
}

/// A blocking wait that another thread may abandon.
///
/// Abandoning only ends the wait; the task keeps running and its eventual
/// completion is ignored.
#[derive(Debug)]
pub struct BlockingWait {
    tx: UnboundedSender<Signal>,
    rx: UnboundedReceiver<Signal>,
}

/// Ends a [`BlockingWait`] early from another thread.
///
/// The handle does not keep the wait alive: once the task has dropped its
/// completion signal, the wait reports that instead of hanging on the handle.
#[derive(Debug, Clone)]
pub struct AbandonHandle {
    tx: WeakUnboundedSender<Signal>,
}

impl AbandonHandle {
    pub fn abandon(&self) {
        // The wait may already be over.
        if let Some(tx) = self.tx.upgrade() {
            let _ = tx.send(Signal::Abandoned);
        }
    }
}

impl BlockingWait {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    pub fn abandon_handle(&self) -> AbandonHandle {
        AbandonHandle {
            tx: self.tx.downgrade(),
        }
    }

    /// Start `task` and block until it completes or the wait is abandoned.
    ///
    /// Returns the task's own failure if starting it failed, and
    /// [`TaskDriverError::Abandoned`] if abandoned first.
    pub fn wait(self, task: &Task) -> Result<()> {
        let Self { tx, mut rx } = self;

        let done = {
            let tx = tx.clone();
            Completion::new(move || {
                let _ = tx.send(Signal::Completed);
                Ok(())
            })
        };
        drop(tx);

        task.start(done)?;

        match rx.blocking_recv() {
            Some(Signal::Completed) => Ok(()),
            Some(Signal::Abandoned) => {
                debug!("blocking wait abandoned; task keeps running");
                Err(TaskDriverError::Abandoned)
            }
            None => Err(TaskDriverError::ContractViolation(
                "task dropped its completion signal without completing".to_string(),
            )),
        }
    }
}

impl Default for BlockingWait {
    fn default() -> Self {
        Self::new()
    }
}
