// src/exec/mod.rs

//! Adapters between tasks and threads.
//!
//! The driver itself never creates threads. These thin wrappers let callers
//! move work elsewhere or wait for it:
//!
//! - [`pool`] runs a synchronous task on a `tokio` blocking pool and
//!   signals completion when it returns.
//! - [`blocking`] blocks the calling thread until a task signals completion,
//!   with an optional handle to abandon the wait.

pub mod blocking;
pub mod pool;

pub use blocking::{block_on_task, AbandonHandle, BlockingWait};
pub use pool::SpawnBlockingTask;
