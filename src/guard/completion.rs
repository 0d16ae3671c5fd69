// src/guard/completion.rs

//! Completion signal handed to asynchronous tasks.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use super::state::GuardEvent;
use super::{CompletionGuard, GuardState};
use crate::errors::Result;

type SharedAction = Arc<dyn Fn() -> Result<()> + Send + Sync>;

/// The callback an asynchronous task must invoke once it is done.
///
/// Cloning is cheap and every clone shares the same guard: no matter how many
/// times (or from how many threads) `complete` is called, the underlying
/// action runs once. The result of `complete` is the result of that action,
/// which for a driver-issued signal includes any failure of a task admitted
/// as a consequence of this completion.
#[derive(Clone)]
pub struct Completion {
    guard: Arc<CompletionGuard>,
    action: SharedAction,
}

impl Completion {
    /// A standalone signal running `action` on the first `complete`.
    pub fn new<F>(action: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        Self {
            guard: Arc::new(CompletionGuard::new()),
            action: Arc::new(action),
        }
    }

    /// A signal with nothing attached; useful when running a task directly.
    pub fn noop() -> Self {
        Self::new(|| Ok(()))
    }

    /// Signal completion. Only the first call has an effect.
    pub fn complete(&self) -> Result<()> {
        let action = Arc::clone(&self.action);
        let fired = self
            .guard
            .fire(GuardEvent::Run(Box::new(move || action())))?;
        if !fired {
            warn!("completion signalled more than once; ignoring");
        }
        Ok(())
    }

    /// Whether `complete` has already taken effect.
    pub fn is_completed(&self) -> bool {
        matches!(self.guard.state(), Ok(GuardState::Run))
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("completed", &self.is_completed())
            .finish_non_exhaustive()
    }
}
