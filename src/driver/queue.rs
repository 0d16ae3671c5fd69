// src/driver/queue.rs

//! The two lanes holding not-yet-started tasks.
//!
//! - FIFO lane: plain submission order.
//! - Priority lane: lower numeric priority first; equal priorities keep
//!   submission order through a sequence number.
//!
//! The priority lane is always drained before the FIFO lane.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, VecDeque};
use std::fmt;
use std::sync::Arc;

use crate::task::AsyncTask;

/// A queued task plus its priority. Lower value means scheduled sooner.
pub struct PriorityEntry {
    pub priority: i32,
    seq: u64,
    pub task: Arc<dyn AsyncTask>,
}

impl PriorityEntry {
    fn key(&self) -> (i32, u64) {
        (self.priority, self.seq)
    }
}

impl PartialEq for PriorityEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for PriorityEntry {}

impl PartialOrd for PriorityEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PriorityEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Debug for PriorityEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriorityEntry")
            .field("priority", &self.priority)
            .field("seq", &self.seq)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub(crate) struct TaskQueue {
    fifo: VecDeque<Arc<dyn AsyncTask>>,
    priority: BinaryHeap<Reverse<PriorityEntry>>,
    next_seq: u64,
}

impl TaskQueue {
    pub(crate) fn push(&mut self, task: Arc<dyn AsyncTask>) {
        self.fifo.push_back(task);
    }

    pub(crate) fn push_with_priority(&mut self, priority: i32, task: Arc<dyn AsyncTask>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.priority.push(Reverse(PriorityEntry {
            priority,
            seq,
            task,
        }));
    }

    /// Remove the next task to start, priority lane first.
    pub(crate) fn pop_next(&mut self) -> Option<Arc<dyn AsyncTask>> {
        match self.priority.pop() {
            Some(Reverse(entry)) => Some(entry.task),
            None => self.fifo.pop_front(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.fifo.len() + self.priority.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discard every queued task in both lanes; returns how many were dropped.
    pub(crate) fn clear(&mut self) -> usize {
        let dropped = self.len();
        self.fifo.clear();
        self.priority.clear();
        dropped
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("fifo", &self.fifo.len())
            .field("priority", &self.priority.len())
            .finish()
    }
}
