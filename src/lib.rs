// src/lib.rs

//! Cooperative task scheduling.
//!
//! A [`TaskDriver`] admits submitted tasks under a [`Limit`], optionally
//! suspended, priority lane first, and reports progress to listeners. It
//! never creates threads: tasks run on whichever thread submits them or
//! signals a completion.
//!
//! ```
//! use taskdriver::{Limit, Task, TaskDriver};
//!
//! let driver = TaskDriver::with_limit(Limit::bounded(2)?);
//! driver.submit(Task::synchronous(|| Ok(())))?;
//! assert_eq!(driver.finished_count(), 1);
//! # Ok::<(), taskdriver::errors::TaskDriverError>(())
//! ```

pub mod config;
pub mod driver;
pub mod errors;
pub mod exec;
pub mod guard;
pub mod logging;
pub mod task;
pub mod types;

pub use driver::{ListenerId, Progress, TaskDriver, TaskListener};
pub use errors::{Result, TaskDriverError};
pub use guard::{Completion, CompletionGuard, GuardState};
pub use task::{
    AsyncTask, Batch, DependentTask, NotifyingTask, NotifyingTaskBatch, RepeatingTask, SyncTask,
    Task, TaskBatch,
};
pub use types::Limit;
