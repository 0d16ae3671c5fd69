// src/driver/listeners.rs

use std::fmt;
use std::sync::Arc;

/// A consistent snapshot of the driver's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub queued: usize,
    pub running: usize,
    pub finished: usize,
}

impl Progress {
    pub fn new(queued: usize, running: usize, finished: usize) -> Self {
        Self {
            queued,
            running,
            finished,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.running == 0
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "queued={} running={} finished={}",
            self.queued, self.running, self.finished
        )
    }
}

/// Observer of driver progress.
///
/// Called outside the driver's lock, so implementations may call back into
/// the driver, including removing themselves.
pub trait TaskListener: Send + Sync {
    fn on_progress(&self, progress: Progress);
}

impl<F> TaskListener for F
where
    F: Fn(Progress) + Send + Sync,
{
    fn on_progress(&self, progress: Progress) {
        self(progress)
    }
}

/// Handle returned by `add_listener`, used to remove the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub(crate) struct ListenerSet {
    entries: Vec<(ListenerId, Arc<dyn TaskListener>)>,
    next_id: u64,
}

impl ListenerSet {
    pub(crate) fn add(&mut self, listener: Arc<dyn TaskListener>) -> ListenerId {
        self.insert_with(|_| listener)
    }

    /// Insert a listener that needs to know its own id.
    pub(crate) fn insert_with<F>(&mut self, build: F) -> ListenerId
    where
        F: FnOnce(ListenerId) -> Arc<dyn TaskListener>,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, build(id)));
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(existing, _)| *existing != id);
        self.entries.len() != before
    }

    /// Copy of the current listeners in registration order.
    pub(crate) fn snapshot(&self) -> Vec<Arc<dyn TaskListener>> {
        self.entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(count: &Arc<AtomicUsize>) -> Arc<dyn TaskListener> {
        let count = Arc::clone(count);
        Arc::new(move |_: Progress| {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn ids_are_unique_and_removal_is_targeted() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut set = ListenerSet::default();
        let a = set.add(counting(&count));
        let b = set.add(counting(&count));
        assert_ne!(a, b);

        assert!(set.remove(a));
        assert!(!set.remove(a));
        assert_eq!(set.len(), 1);

        for listener in set.snapshot() {
            listener.on_progress(Progress::default());
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn snapshot_is_unaffected_by_later_removal() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut set = ListenerSet::default();
        let id = set.add(counting(&count));

        let snapshot = set.snapshot();
        set.remove(id);

        for listener in snapshot {
            listener.on_progress(Progress::new(0, 0, 1));
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(set.snapshot().is_empty());
    }

    #[test]
    fn insert_with_passes_own_id() {
        let mut set = ListenerSet::default();
        let mut seen = None;
        let id = set.insert_with(|id| {
            seen = Some(id);
            Arc::new(|_: Progress| {})
        });
        assert_eq!(seen, Some(id));
    }
}
