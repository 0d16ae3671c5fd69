// src/guard/mod.rs

//! At-most-once execution guards.
//!
//! - [`state`] holds the four-state machine and its transition function.
//! - [`CompletionGuard`] wraps that machine in a lock so any number of
//!   callers, on any threads, can race `run` / `allow` / `suspend` and the
//!   action still executes at most once.
//! - [`completion`] builds the completion signal handed to asynchronous
//!   tasks on top of a guard.

pub mod completion;
pub mod state;

use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::trace;

use crate::errors::{Result, TaskDriverError};

pub use completion::Completion;
pub use state::GuardState;
use state::{transition, Action, GuardEvent, Slot};

/// Guarantees that a deferred action runs at most once, optionally holding
/// it back while suspended.
///
/// Actions are always invoked after the internal lock is released, so an
/// action may call back into the same guard.
pub struct CompletionGuard {
    slot: Mutex<Slot>,
}

impl CompletionGuard {
    /// A guard in `Idle`: the first `run` invokes its action immediately.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Idle),
        }
    }

    /// A guard in `Suspended`: the first `run` is deferred until `allow`.
    pub fn new_suspended() -> Self {
        Self {
            slot: Mutex::new(Slot::Suspended),
        }
    }

    /// Run `action` if nothing has run (or been scheduled) yet.
    ///
    /// Returns the action's own result when it is invoked by this call, and
    /// `Ok(())` when the call was ignored or deferred.
    pub fn run<F>(&self, action: F) -> Result<()>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.fire(GuardEvent::Run(Box::new(action))).map(|_| ())
    }

    /// Lift a suspension, invoking the stored action if one was scheduled.
    pub fn allow(&self) -> Result<()> {
        self.fire(GuardEvent::Allow).map(|_| ())
    }

    /// Defer future `run` calls until `allow`. Has no effect unless `Idle`.
    pub fn suspend(&self) -> Result<()> {
        self.fire(GuardEvent::Suspend).map(|_| ())
    }

    /// Current state of this guard.
    pub fn state(&self) -> Result<GuardState> {
        Ok(self.lock()?.view())
    }

    /// Wrap `action` so that invoking the returned closure goes through this
    /// guard. Calls through the wrapper and direct `run` calls share a single
    /// at-most-once budget.
    pub fn wrap<F>(self: &Arc<Self>, action: F) -> impl Fn() -> Result<()> + Send + Sync + use<F>
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        let guard = Arc::clone(self);
        let action = Arc::new(action);
        move || {
            let action = Arc::clone(&action);
            guard.run(move || action())
        }
    }

    /// Apply one event; returns whether an action was invoked.
    pub(crate) fn fire(&self, event: GuardEvent) -> Result<bool> {
        let name = event.name();
        let action: Option<Action> = {
            let mut slot = self.lock()?;
            let current = std::mem::replace(&mut *slot, Slot::Run);
            let before = current.view();
            let (next, action) = transition(current, event);
            trace!(event = name, ?before, after = ?next.view(), "completion guard transition");
            *slot = next;
            action
        };

        match action {
            Some(action) => action().map(|_| true),
            None => Ok(false),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Slot>> {
        self.slot.lock().map_err(|_| {
            TaskDriverError::ContractViolation(
                "completion guard state is poisoned; its state is undefined".to_string(),
            )
        })
    }
}

impl Default for CompletionGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CompletionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("CompletionGuard");
        match self.slot.lock() {
            Ok(slot) => s.field("state", &slot.view()),
            Err(_) => s.field("state", &"<poisoned>"),
        };
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Result<()> + Send + Sync + Clone + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (count, move || {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn runs_same_action_once() {
        let guard = CompletionGuard::new();
        let (count, action) = counter();

        guard.run(action.clone()).unwrap();
        guard.run(action).unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(guard.state().unwrap(), GuardState::Run);
    }

    #[test]
    fn second_action_is_ignored() {
        let guard = CompletionGuard::new();
        let (count1, action1) = counter();
        let (count2, action2) = counter();

        for _ in 0..3 {
            guard.run(action1.clone()).unwrap();
            guard.run(action2.clone()).unwrap();
        }

        assert_eq!(count1.load(Ordering::SeqCst), 1);
        assert_eq!(count2.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn scheduled_while_suspended_runs_on_allow() {
        let guard = CompletionGuard::new_suspended();
        let (count, action) = counter();

        guard.run(action).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(guard.state().unwrap(), GuardState::Scheduled);

        guard.allow().unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn allow_while_idle_is_noop() {
        let guard = CompletionGuard::new();
        let (count, action) = counter();

        guard.allow().unwrap();
        guard.run(action).unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn allow_after_suspended_returns_to_idle() {
        let guard = CompletionGuard::new_suspended();
        let (count, action) = counter();

        guard.allow().unwrap();
        assert_eq!(guard.state().unwrap(), GuardState::Idle);
        guard.run(action).unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn suspend_then_allow_runs_once_despite_shenanigans() {
        let guard = CompletionGuard::new();
        let (count, action) = counter();

        guard.suspend().unwrap();
        guard.run(action.clone()).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);

        guard.allow().unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        guard.run(action.clone()).unwrap();
        guard.allow().unwrap();
        guard.run(action).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn suspend_after_run_has_no_effect() {
        let guard = CompletionGuard::new();
        let (count, action) = counter();
        guard.run(action.clone()).unwrap();

        guard.suspend().unwrap();
        guard.allow().unwrap();
        guard.run(action).unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn suspend_while_scheduled_keeps_schedule() {
        let guard = CompletionGuard::new_suspended();
        let (count, action) = counter();
        guard.run(action).unwrap();

        guard.suspend().unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);

        guard.allow().unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn only_first_scheduled_action_runs() {
        let guard = CompletionGuard::new_suspended();
        let (count1, action1) = counter();
        let (count2, action2) = counter();

        guard.run(action1).unwrap();
        guard.run(action2).unwrap();
        guard.allow().unwrap();

        assert_eq!(count1.load(Ordering::SeqCst), 1);
        assert_eq!(count2.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn wrap_shares_budget_with_run() {
        let guard = Arc::new(CompletionGuard::new());
        let (count1, action1) = counter();
        let (count2, action2) = counter();

        let wrapped = guard.wrap(action1);
        assert_eq!(count1.load(Ordering::SeqCst), 0);

        wrapped().unwrap();
        assert_eq!(count1.load(Ordering::SeqCst), 1);

        wrapped().unwrap();
        guard.run(action2).unwrap();
        assert_eq!(count1.load(Ordering::SeqCst), 1);
        assert_eq!(count2.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn action_may_reenter_guard() {
        let guard = Arc::new(CompletionGuard::new());
        let inner = Arc::clone(&guard);
        let (count, action) = counter();

        guard
            .run(move || {
                // Re-entrant call must not deadlock and must be ignored.
                inner.run(action)
            })
            .unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn action_error_is_returned_from_invoking_call() {
        let guard = CompletionGuard::new();
        let err = guard
            .run(|| Err(TaskDriverError::InvalidArgument("nope".into())))
            .unwrap_err();
        assert!(matches!(err, TaskDriverError::InvalidArgument(_)));
        assert_eq!(guard.state().unwrap(), GuardState::Run);
    }

    #[test]
    fn concurrent_runs_execute_once() {
        let guard = Arc::new(CompletionGuard::new());
        let (count, action) = counter();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = Arc::clone(&guard);
                let action = action.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        guard.run(action.clone()).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn poisoned_state_is_a_contract_violation() {
        let guard = Arc::new(CompletionGuard::new());
        let poisoner = Arc::clone(&guard);
        let _ = std::thread::spawn(move || {
            let _held = poisoner.slot.lock().unwrap();
            panic!("poison the guard state");
        })
        .join();

        let (count, action) = counter();
        assert!(matches!(
            guard.run(action),
            Err(TaskDriverError::ContractViolation(_))
        ));
        assert!(matches!(guard.allow(), Err(TaskDriverError::ContractViolation(_))));
        assert!(matches!(guard.suspend(), Err(TaskDriverError::ContractViolation(_))));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
