//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading the engine
//! configuration from a YAML file.

use std::fs;
use std::path::Path;

use crate::error::{EngineError, EngineResult};

use super::types::EngineConfig;

/// Loads and validates the engine configuration.
///
/// # Example
///
/// ```no_run
/// use worktime_engine::config::ConfigLoader;
///
/// let config = ConfigLoader::load("./engine.yaml").unwrap();
/// assert!(config.cache.version >= 1);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration from the specified YAML file.
    ///
    /// Missing sections fall back to their defaults. Returns an error if
    /// the file is missing, is not valid YAML, or fails cross-field
    /// validation (for example, non-increasing overtime thresholds).
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<EngineConfig> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        let config: EngineConfig =
            serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigInvalid {
                path: path_str.clone(),
                message: e.to_string(),
            })?;

        config.validate().map_err(|message| EngineError::ConfigInvalid {
            path: path_str,
            message,
        })?;

        Ok(config)
    }
}
