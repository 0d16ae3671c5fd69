// src/driver/reentry.rs

//! Marks which drivers the current thread is draining.
//!
//! A synchronous task that submits work or completes inline calls back into
//! `drain` while an outer drain of the same driver is still running on this
//! thread. The nested drain admits as usual, but only the outermost one
//! notifies listeners, so a triggering call yields a single snapshot.

use std::cell::RefCell;

thread_local!(static DRAINING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) });

/// Held for the duration of one drain loop.
pub(crate) struct DrainScope {
    driver: usize,
    outermost: bool,
}

impl DrainScope {
    pub(crate) fn enter(driver: usize) -> Self {
        DRAINING.with(|draining| {
            let mut draining = draining.borrow_mut();
            let outermost = !draining.contains(&driver);
            draining.push(driver);
            DrainScope { driver, outermost }
        })
    }

    /// Whether no other drain of this driver is active further up the stack.
    pub(crate) fn is_outermost(&self) -> bool {
        self.outermost
    }
}

impl Drop for DrainScope {
    fn drop(&mut self) {
        DRAINING.with(|draining| {
            let mut draining = draining.borrow_mut();
            if let Some(pos) = draining.iter().rposition(|d| *d == self.driver) {
                draining.remove(pos);
            }
        });
    }
}
