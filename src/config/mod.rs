// src/config/mod.rs

//! Driver configuration loaded from TOML.
//!
//! - [`model`] holds the raw (as deserialized) and validated shapes.
//! - [`loader`] reads files and strings.
//! - [`validate`] turns a raw config into a validated one.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{from_toml_str, load_and_validate, load_from_path};
pub use model::{ConfigFile, DriverConfig, LoggingSection, RawConfigFile};
