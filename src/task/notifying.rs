// src/task/notifying.rs

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use super::{AsyncTask, Task};
use crate::errors::Result;
use crate::guard::Completion;

type Subscriber = Arc<dyn Fn() -> Result<()> + Send + Sync>;

/// A task that notifies subscribers whenever it completes.
///
/// Submit the `NotifyingTask` itself (not the inner task). Clones share the
/// subscriber list and the completion flag.
///
/// The "has completed" flag is set by the first completion and never reset:
/// once the task has completed at least once, later subscribers fire
/// immediately, even while a reused instance is running again.
#[derive(Clone)]
pub struct NotifyingTask {
    shared: Arc<Shared>,
}

struct Shared {
    task: Arc<dyn AsyncTask>,
    subscribers: Mutex<Subscribers>,
}

#[derive(Default)]
struct Subscribers {
    callbacks: Vec<Subscriber>,
    has_completed: bool,
}

impl NotifyingTask {
    pub fn new(task: Task) -> Self {
        Self {
            shared: Arc::new(Shared {
                task: task.into_async(),
                subscribers: Mutex::new(Subscribers::default()),
            }),
        }
    }

    /// Construct with one subscriber already registered.
    pub fn with_subscriber<F>(task: Task, subscriber: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        let notifying = Self::new(task);
        notifying.lock().callbacks.push(Arc::new(subscriber));
        notifying
    }

    /// Register `subscriber` for every future completion.
    ///
    /// If the task has already completed at least once, `subscriber` is also
    /// invoked right away, and its result returned.
    pub fn subscribe<F>(&self, subscriber: F) -> Result<()>
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        let subscriber: Subscriber = Arc::new(subscriber);
        let already_completed = {
            let mut subs = self.lock();
            subs.callbacks.push(Arc::clone(&subscriber));
            subs.has_completed
        };

        if already_completed {
            debug!("subscribing to an already completed task; notifying immediately");
            subscriber()
        } else {
            Ok(())
        }
    }

    pub fn has_completed(&self) -> bool {
        self.lock().has_completed
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().callbacks.len()
    }

    fn lock(&self) -> MutexGuard<'_, Subscribers> {
        self.shared
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Shared {
    /// Notify every subscriber known at this instant, then propagate the
    /// completion. A failing subscriber does not prevent the others from
    /// running nor the completion from propagating; the first failure is
    /// returned afterwards.
    fn on_inner_done(&self, outer: &Completion) -> Result<()> {
        let snapshot = {
            let mut subs = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
            subs.has_completed = true;
            subs.callbacks.clone()
        };

        let mut first_failure = None;
        for subscriber in snapshot {
            if let Err(err) = subscriber() {
                warn!(error = %err, "completion subscriber failed");
                first_failure.get_or_insert(err);
            }
        }

        let completed = outer.complete();
        match first_failure {
            Some(err) => Err(err),
            None => completed,
        }
    }
}

impl AsyncTask for NotifyingTask {
    fn start(&self, done: Completion) -> anyhow::Result<()> {
        let shared = Arc::clone(&self.shared);
        let inner_done = Completion::new(move || shared.on_inner_done(&done));
        self.shared.task.start(inner_done)
    }
}

impl From<NotifyingTask> for Task {
    fn from(task: NotifyingTask) -> Self {
        Task::from_async(task)
    }
}

impl fmt::Debug for NotifyingTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subs = self.lock();
        f.debug_struct("NotifyingTask")
            .field("subscribers", &subs.callbacks.len())
            .field("has_completed", &subs.has_completed)
            .finish()
    }
}
