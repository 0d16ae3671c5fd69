// src/guard/state.rs

//! The four-state machine behind [`CompletionGuard`](super::CompletionGuard).
//!
//! | State     | run(action)               | allow()                  | suspend()    |
//! |-----------|---------------------------|--------------------------|--------------|
//! | Idle      | -> Run, invoke action now | no-op                    | -> Suspended |
//! | Suspended | store action, -> Scheduled| -> Idle                  | no-op        |
//! | Scheduled | no-op                     | -> Run, invoke stored    | no-op        |
//! | Run       | no-op                     | no-op                    | no-op        |

use std::fmt;

use crate::errors::Result;

/// A deferred one-shot action.
pub(crate) type Action = Box<dyn FnOnce() -> Result<()> + Send>;

/// Public, read-only view of a guard's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// Nothing has run; `run` would invoke its action immediately.
    Idle,
    /// Running has not been attempted; `run` would defer its action.
    Suspended,
    /// Running was attempted while suspended; `allow` invokes the stored action.
    Scheduled,
    /// The action has run. Terminal.
    Run,
}

/// Internal state, carrying the stored action while `Scheduled`.
pub(crate) enum Slot {
    Idle,
    Suspended,
    Scheduled(Action),
    Run,
}

impl Slot {
    pub(crate) fn view(&self) -> GuardState {
        match self {
            Slot::Idle => GuardState::Idle,
            Slot::Suspended => GuardState::Suspended,
            Slot::Scheduled(_) => GuardState::Scheduled,
            Slot::Run => GuardState::Run,
        }
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.view(), f)
    }
}

pub(crate) enum GuardEvent {
    Run(Action),
    Allow,
    Suspend,
}

impl GuardEvent {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            GuardEvent::Run(_) => "run",
            GuardEvent::Allow => "allow",
            GuardEvent::Suspend => "suspend",
        }
    }
}

/// Apply one event, returning the next state and the action to invoke (if
/// any). The caller must invoke the action only after releasing its lock.
pub(crate) fn transition(slot: Slot, event: GuardEvent) -> (Slot, Option<Action>) {
    match (slot, event) {
        (Slot::Idle, GuardEvent::Run(action)) => (Slot::Run, Some(action)),
        (Slot::Idle, GuardEvent::Allow) => (Slot::Idle, None),
        (Slot::Idle, GuardEvent::Suspend) => (Slot::Suspended, None),

        (Slot::Suspended, GuardEvent::Run(action)) => (Slot::Scheduled(action), None),
        (Slot::Suspended, GuardEvent::Allow) => (Slot::Idle, None),
        (Slot::Suspended, GuardEvent::Suspend) => (Slot::Suspended, None),

        // The first scheduled action wins; later ones are dropped.
        (Slot::Scheduled(stored), GuardEvent::Run(_)) => (Slot::Scheduled(stored), None),
        (Slot::Scheduled(stored), GuardEvent::Allow) => (Slot::Run, Some(stored)),
        (Slot::Scheduled(stored), GuardEvent::Suspend) => (Slot::Scheduled(stored), None),

        (Slot::Run, _) => (Slot::Run, None),
    }
}
