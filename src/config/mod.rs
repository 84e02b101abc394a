//! Configuration module for certscope
//!
//! Handles loading settings from TOML files.

pub mod settings;

pub use settings::{AnalysisSettings, FetchSettings, ServerSettings, Settings};

use crate::utils::ConfigError;
use std::path::Path;

/// Load settings from `path`, or from the default location when none is given
pub fn load_settings<P: AsRef<Path>>(path: Option<P>) -> Result<Settings, ConfigError> {
    match path {
        Some(path) => Settings::load_from_file(path),
        None => Settings::load_default(),
    }
}
