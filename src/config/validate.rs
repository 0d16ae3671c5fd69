// src/config/validate.rs

use crate::config::model::{ConfigFile, DriverConfig, RawConfigFile, RawDriverSection, RawLimit};
use crate::errors::{Result, TaskDriverError};
use crate::types::Limit;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = TaskDriverError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let driver = validate_driver(&raw.driver)?;
        Ok(ConfigFile::new_unchecked(driver, raw.logging))
    }
}

fn validate_driver(section: &RawDriverSection) -> Result<DriverConfig> {
    let limit = match &section.limit {
        None => Limit::Unbounded,
        Some(raw) => validate_limit(raw)?,
    };
    Ok(DriverConfig {
        limit,
        start_suspended: section.start_suspended,
    })
}

fn validate_limit(raw: &RawLimit) -> Result<Limit> {
    let parsed = match raw {
        RawLimit::Count(n) => Limit::bounded(*n),
        RawLimit::Keyword(s) => s.parse::<Limit>(),
    };
    parsed.map_err(|_| {
        let shown = match raw {
            RawLimit::Count(n) => n.to_string(),
            RawLimit::Keyword(s) => format!("{s:?}"),
        };
        TaskDriverError::Config(format!(
            "[driver].limit must be a positive integer or \"unbounded\" (got {shown})"
        ))
    })
}
