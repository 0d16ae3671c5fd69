// src/task/batch.rs

//! Ordered, reusable task collections.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::debug;

use super::{AsyncTask, Task};
use crate::errors::Result;
use crate::guard::Completion;

/// Something the driver can read a list of tasks from at submission time.
pub trait Batch {
    /// The tasks to submit, in order. Called once per submission.
    fn snapshot(&self) -> Vec<Task>;
}

/// Tasks ordered by when they were added. Sync and async tasks may be mixed.
///
/// A batch can be submitted again later; each submission reads the members
/// present at that moment.
#[derive(Clone, Default)]
pub struct TaskBatch {
    tasks: Vec<Task>,
}

impl TaskBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tasks<I>(tasks: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Task>,
    {
        Self {
            tasks: tasks.into_iter().map(Into::into).collect(),
        }
    }

    pub fn add(&mut self, task: impl Into<Task>) -> &mut Self {
        self.tasks.push(task.into());
        self
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl Batch for TaskBatch {
    fn snapshot(&self) -> Vec<Task> {
        self.tasks.clone()
    }
}

impl<T: Into<Task>> Extend<T> for TaskBatch {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.tasks.extend(iter.into_iter().map(Into::into));
    }
}

impl fmt::Debug for TaskBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskBatch").field("len", &self.len()).finish()
    }
}

type Notify = Arc<dyn Fn() -> Result<()> + Send + Sync>;

/// A [`TaskBatch`] that calls `notify` once every member of a submission
/// has completed.
///
/// Each call to [`Batch::snapshot`] starts its own countdown over the members
/// present at that instant; members added afterwards belong to the next
/// submission only. A snapshot of an empty batch never notifies.
#[derive(Clone)]
pub struct NotifyingTaskBatch {
    tasks: TaskBatch,
    notify: Notify,
}

impl NotifyingTaskBatch {
    pub fn new<F>(notify: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        Self::with_tasks(notify, TaskBatch::new())
    }

    pub fn with_tasks<F>(notify: F, tasks: TaskBatch) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        Self {
            tasks,
            notify: Arc::new(notify),
        }
    }
}

impl Deref for NotifyingTaskBatch {
    type Target = TaskBatch;

    fn deref(&self) -> &TaskBatch {
        &self.tasks
    }
}

impl DerefMut for NotifyingTaskBatch {
    fn deref_mut(&mut self) -> &mut TaskBatch {
        &mut self.tasks
    }
}

impl Batch for NotifyingTaskBatch {
    fn snapshot(&self) -> Vec<Task> {
        let members = self.tasks.snapshot();
        let countdown = Arc::new(Countdown {
            remaining: AtomicUsize::new(members.len()),
            notify: Arc::clone(&self.notify),
        });
        debug!(members = members.len(), "starting batch countdown");

        members
            .into_iter()
            .map(|task| {
                Task::from_async(CountedMember {
                    task: task.into_async(),
                    countdown: Arc::clone(&countdown),
                })
            })
            .collect()
    }
}

impl fmt::Debug for NotifyingTaskBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyingTaskBatch")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

struct Countdown {
    remaining: AtomicUsize,
    notify: Notify,
}

impl Countdown {
    fn tick(&self) -> Result<()> {
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            debug!("batch countdown reached zero");
            (self.notify)()
        } else {
            Ok(())
        }
    }
}

/// One member of a counted submission. The countdown ticks before the
/// member's own completion propagates.
struct CountedMember {
    task: Arc<dyn AsyncTask>,
    countdown: Arc<Countdown>,
}

impl AsyncTask for CountedMember {
    fn start(&self, done: Completion) -> anyhow::Result<()> {
        let countdown = Arc::clone(&self.countdown);
        let counted = Completion::new(move || {
            let ticked = countdown.tick();
            let completed = done.complete();
            ticked.and(completed)
        });
        self.task.start(counted)
    }
}
