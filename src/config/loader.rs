// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Read a TOML file into a [`RawConfigFile`].
///
/// Deserialization only; use [`load_and_validate`] to also check values.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    debug!(path = %path.display(), "loading driver config");
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Read and validate a TOML file.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Parse and validate TOML held in memory.
pub fn from_toml_str(contents: &str) -> Result<ConfigFile> {
    let raw_config: RawConfigFile = toml::from_str(contents)?;
    ConfigFile::try_from(raw_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TaskDriverError;
    use crate::logging::LogLevel;
    use crate::types::Limit;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = from_toml_str("").unwrap();
        assert_eq!(cfg.driver.limit, Limit::Unbounded);
        assert!(!cfg.driver.start_suspended);
        assert_eq!(cfg.logging.level, None);
    }

    #[test]
    fn parses_all_sections() {
        let cfg = from_toml_str(
            r#"
            [driver]
            limit = 4
            start_suspended = true

            [logging]
            level = "trace"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.driver.limit, Limit::bounded(4).unwrap());
        assert!(cfg.driver.start_suspended);
        assert_eq!(cfg.logging.level, Some(LogLevel::Trace));
    }

    #[test]
    fn unknown_keys_are_toml_errors() {
        let err = from_toml_str("[driver]\nlimmit = 3\n").unwrap_err();
        assert!(matches!(err, TaskDriverError::Toml(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_and_validate("/definitely/not/here/taskdriver.toml").unwrap_err();
        assert!(matches!(err, TaskDriverError::Io(_)));
    }
}
