use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use crate::errors::{Result, TaskDriverError};

/// Admission limit for a [`TaskDriver`](crate::driver::TaskDriver): either a
/// concrete positive capacity or no cap at all.
///
/// `Unbounded` compares as larger than every value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Limit {
    Bounded(NonZeroUsize),
    Unbounded,
}

impl Limit {
    /// Create a positive limit.
    ///
    /// Fails with [`TaskDriverError::InvalidArgument`] if `value < 1`.
    pub fn bounded(value: i64) -> Result<Self> {
        usize::try_from(value)
            .ok()
            .and_then(NonZeroUsize::new)
            .map(Limit::Bounded)
            .ok_or_else(|| {
                TaskDriverError::InvalidArgument(format!(
                    "limit must be positive, but was {value}"
                ))
            })
    }

    pub fn unbounded() -> Self {
        Limit::Unbounded
    }

    /// Whether this is a concrete limit.
    pub fn is_bounded(&self) -> bool {
        matches!(self, Limit::Bounded(_))
    }

    /// The concrete limit, or `None` when unbounded.
    pub fn get(&self) -> Option<usize> {
        match self {
            Limit::Bounded(n) => Some(n.get()),
            Limit::Unbounded => None,
        }
    }

    pub fn greater_than(&self, value: usize) -> bool {
        self.get().is_none_or(|n| n > value)
    }

    pub fn less_than(&self, value: usize) -> bool {
        self.get().is_some_and(|n| n < value)
    }

    pub fn greater_than_or_equal(&self, value: usize) -> bool {
        self.get().is_none_or(|n| n >= value)
    }

    pub fn less_than_or_equal(&self, value: usize) -> bool {
        self.get().is_some_and(|n| n <= value)
    }
}

impl Default for Limit {
    fn default() -> Self {
        Limit::Unbounded
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Bounded(n) => write!(f, "{n}"),
            Limit::Unbounded => f.write_str("unbounded"),
        }
    }
}

impl FromStr for Limit {
    type Err = TaskDriverError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "unbounded" | "none" => Ok(Limit::Unbounded),
            other => {
                let value = other.parse::<i64>().map_err(|_| {
                    TaskDriverError::InvalidArgument(format!(
                        "invalid limit: {other} (expected a positive integer or \"unbounded\")"
                    ))
                })?;
                Limit::bounded(value)
            }
        }
    }
}

impl TryFrom<i64> for Limit {
    type Error = TaskDriverError;

    fn try_from(value: i64) -> Result<Self> {
        Limit::bounded(value)
    }
}
