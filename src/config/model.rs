// src/config/model.rs

use serde::Deserialize;

use crate::logging::LogLevel;
use crate::types::Limit;

/// Configuration as read from TOML, before validation.
///
/// ```toml
/// [driver]
/// limit = 4              # or "unbounded"
/// start_suspended = false
///
/// [logging]
/// level = "debug"
/// ```
///
/// Every section and key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub driver: RawDriverSection,

    #[serde(default)]
    pub logging: LoggingSection,
}

/// `[driver]` section as written.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawDriverSection {
    /// A positive integer or a keyword such as `"unbounded"`. Missing means
    /// unbounded.
    #[serde(default)]
    pub limit: Option<RawLimit>,

    #[serde(default)]
    pub start_suspended: bool,
}

/// `limit = 4` and `limit = "unbounded"` are both accepted by the parser;
/// [`validate`](super::validate) decides whether the value makes sense.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawLimit {
    Count(i64),
    Keyword(String),
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Overrides `TASKDRIVER_LOG` when set.
    #[serde(default)]
    pub level: Option<LogLevel>,
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub driver: DriverConfig,
    pub logging: LoggingSection,
}

/// How to build a [`TaskDriver`](crate::driver::TaskDriver).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DriverConfig {
    pub limit: Limit,
    pub start_suspended: bool,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(driver: DriverConfig, logging: LoggingSection) -> Self {
        Self { driver, logging }
    }
}
