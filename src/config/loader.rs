// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::ConfigFile;
use crate::config::validate::validate_config;
use crate::errors::{GantryError, Result};

/// Read and deserialize a config file. No semantic validation; use
/// [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        GantryError::Config(format!("reading config file at {}: {e}", path.display()))
    })?;

    let config: ConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Load a config file and run semantic validation.
///
/// This is the entry point the rest of the application uses:
/// - reads TOML, applying `serde` defaults
/// - checks the task graph (unknown deps, cycles), modes, durations,
///   serve settings and queue bounds
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let config = load_from_path(&path)?;
    validate_config(&config)?;
    Ok(config)
}

/// Default config path: `Gantry.toml` in the working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Gantry.toml")
}
