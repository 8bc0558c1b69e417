//! Configuration loading from `~/.placelink/config.json`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::types::Config;

/// The placelink state directory (`~/.placelink`).
pub fn state_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::HomeDirNotFound)?;
    Ok(home.join(".placelink"))
}

/// Load configuration from `~/.placelink/config.json`.
///
/// A missing file is not an error: every setting has a default.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&state_dir()?.join("config.json"))
}

/// Load configuration from an explicit path, falling back to defaults if absent.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        log::debug!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}

/// Resolve the knowledge store path: the configured `dbPath`, or `~/.placelink/places.db`.
pub fn db_path(config: &Config) -> Result<PathBuf, ConfigError> {
    match &config.db_path {
        Some(path) if !path.trim().is_empty() => Ok(PathBuf::from(path)),
        _ => Ok(state_dir()?.join("places.db")),
    }
}
