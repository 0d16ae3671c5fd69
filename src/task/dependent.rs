// src/task/dependent.rs

use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::debug;

use super::{NotifyingTask, Task};
use crate::driver::TaskDriver;
use crate::errors::Result;
use crate::guard::Completion;

/// A task that is submitted to a driver only once a set of other tasks have
/// all completed.
///
/// It is itself a [`NotifyingTask`], so other dependents can wait on it.
#[derive(Clone, Debug)]
pub struct DependentTask {
    task: NotifyingTask,
}

impl DependentTask {
    pub fn new(task: impl Into<Task>) -> Self {
        Self {
            task: NotifyingTask::new(task.into()),
        }
    }

    pub fn notifying(&self) -> &NotifyingTask {
        &self.task
    }

    /// Submit this task to `driver` once every task in `dependencies` has
    /// completed.
    ///
    /// With no dependencies the task is submitted right away. A dependency
    /// that has already completed counts immediately, so this may submit
    /// before returning. Errors from such an immediate submission are
    /// returned here.
    pub fn schedule<'a, I>(&self, driver: &TaskDriver, dependencies: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a NotifyingTask>,
    {
        let dependencies: Vec<&NotifyingTask> = dependencies.into_iter().collect();
        if dependencies.is_empty() {
            return driver.submit(self.task.clone());
        }

        debug!(dependencies = dependencies.len(), "scheduling dependent task");
        let remaining = Arc::new(AtomicUsize::new(dependencies.len()));

        for dependency in dependencies {
            let remaining = Arc::clone(&remaining);
            let driver = driver.clone();
            let task = self.task.clone();
            // Each dependency counts once, even if it completes repeatedly.
            let counted = Completion::new(move || {
                if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                    debug!("dependencies satisfied; submitting dependent task");
                    driver.submit(task.clone())
                } else {
                    Ok(())
                }
            });
            dependency.subscribe(move || counted.complete())?;
        }
        Ok(())
    }
}

impl Deref for DependentTask {
    type Target = NotifyingTask;

    fn deref(&self) -> &NotifyingTask {
        &self.task
    }
}

impl From<DependentTask> for Task {
    fn from(task: DependentTask) -> Self {
        Task::from(task.task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_dependencies_submits_immediately() {
        let driver = TaskDriver::new();
        let dependent = DependentTask::new(Task::asynchronous(|_done: Completion| Ok(())));

        dependent.schedule(&driver, []).unwrap();

        assert_eq!(driver.running_count(), 1);
    }

    #[test]
    fn already_completed_dependency_counts_immediately() {
        let driver = TaskDriver::new();
        let dependency = NotifyingTask::new(Task::synchronous(|| Ok(())));
        driver.submit(dependency.clone()).unwrap();
        assert!(dependency.has_completed());

        let dependent = DependentTask::new(Task::asynchronous(|_done: Completion| Ok(())));
        dependent.schedule(&driver, [&dependency]).unwrap();

        assert_eq!(driver.running_count(), 1);
    }

    #[test]
    fn repeated_dependency_completion_counts_once() {
        let driver = TaskDriver::new();
        let a = NotifyingTask::new(Task::synchronous(|| Ok(())));
        let b = NotifyingTask::new(Task::synchronous(|| Ok(())));
        let dependent = DependentTask::new(Task::asynchronous(|_done: Completion| Ok(())));
        dependent.schedule(&driver, [&a, &b]).unwrap();

        driver.submit(a.clone()).unwrap();
        driver.submit(a.clone()).unwrap();
        assert_eq!(driver.running_count(), 0);
        assert_eq!(driver.finished_count(), 2);

        driver.submit(b.clone()).unwrap();
        assert_eq!(driver.running_count(), 1);
    }
}
