// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskDriverError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// A task body failed. The driver never swallows these; they surface at
    /// whichever call admitted the task.
    #[error("Task failed: {0}")]
    Task(anyhow::Error),

    #[error("Blocking wait was abandoned before the task completed")]
    Abandoned,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl TaskDriverError {
    /// Convert a task body failure into a driver error.
    ///
    /// If the body only forwarded a `TaskDriverError` (e.g. it called
    /// `Completion::complete` and used `?`), the original error is returned
    /// as-is instead of being wrapped a second time.
    pub fn from_task(err: anyhow::Error) -> Self {
        match err.downcast::<TaskDriverError>() {
            Ok(inner) => inner,
            Err(other) => TaskDriverError::Task(other),
        }
    }

    /// Whether this error originated in a task body.
    pub fn is_task_failure(&self) -> bool {
        matches!(self, TaskDriverError::Task(_))
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskDriverError>;
