#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use taskdriver::{Result, Task};

pub use taskdriver_test_utils::{
    assert_progress, drive_until_idle, init_tracing, with_timeout, ManualTasks, RecordingListener,
};

/// A synchronous task bumping `counter` each time it runs.
pub fn counting_task(counter: &Arc<AtomicUsize>) -> Task {
    let counter = Arc::clone(counter);
    Task::synchronous(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
}

/// A callback bumping `counter`, for subscribers and batch notifications.
pub fn counting_callback(counter: &Arc<AtomicUsize>) -> impl Fn() -> Result<()> + Send + Sync + 'static {
    let counter = Arc::clone(counter);
    move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn count(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}
