// src/logging.rs

//! Logging setup for `taskdriver` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. explicit [`LogLevel`] (e.g. from `[logging].level` in config)
//! 2. `TASKDRIVER_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`
//!
//! Logs are sent to STDERR.

use std::str::FromStr;

use anyhow::Result;
use serde::Deserialize;
use tracing_subscriber::fmt;

/// Log verbosity accepted by [`init_logging`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!(
                "invalid log level: {other} (expected error, warn, info, debug or trace)"
            )),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(lvl: LogLevel) -> Self {
        match lvl {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Initialise global logging subscriber.
///
/// Fails if a global subscriber has already been installed.
pub fn init_logging(level: Option<LogLevel>) -> Result<()> {
    let level = resolve_level(level, std::env::var("TASKDRIVER_LOG").ok().as_deref());

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(())
}

fn resolve_level(explicit: Option<LogLevel>, env: Option<&str>) -> tracing::Level {
    match explicit {
        Some(lvl) => lvl.into(),
        None => env
            .and_then(|s| s.parse::<LogLevel>().ok())
            .map(tracing::Level::from)
            .unwrap_or(tracing::Level::INFO),
    }
}
