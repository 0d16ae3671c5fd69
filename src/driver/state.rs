// src/driver/state.rs

//! Mutable driver state. Only ever touched under the driver's lock.

use std::sync::Arc;

use super::listeners::{ListenerSet, Progress};
use super::queue::TaskQueue;
use crate::task::AsyncTask;
use crate::types::Limit;

#[derive(Debug, Default)]
pub(crate) struct DriverState {
    pub(crate) started: usize,
    pub(crate) finished: usize,
    pub(crate) suspended: bool,
    pub(crate) limit: Limit,
    pub(crate) queue: TaskQueue,
    pub(crate) listeners: ListenerSet,
}

impl DriverState {
    pub(crate) fn new(limit: Limit, suspended: bool) -> Self {
        Self {
            limit,
            suspended,
            ..Self::default()
        }
    }

    pub(crate) fn running(&self) -> usize {
        self.started - self.finished
    }

    pub(crate) fn progress(&self) -> Progress {
        Progress::new(self.queue.len(), self.running(), self.finished)
    }

    /// Whether another task may start right now, ignoring queue contents.
    pub(crate) fn has_capacity(&self) -> bool {
        !self.suspended && self.limit.greater_than(self.running())
    }

    /// Pop the next task to start and count it as started, if suspension,
    /// the limit, and the lanes allow it.
    pub(crate) fn next_admission(&mut self) -> Option<Arc<dyn AsyncTask>> {
        if !self.has_capacity() || self.queue.is_empty() {
            return None;
        }
        let task = self.queue.pop_next()?;
        self.started += 1;
        Some(task)
    }

    /// Count one completion. Returns `false` (and changes nothing) if it
    /// would make `finished` overtake `started`.
    pub(crate) fn record_finished(&mut self) -> bool {
        if self.finished >= self.started {
            return false;
        }
        self.finished += 1;
        true
    }
}
