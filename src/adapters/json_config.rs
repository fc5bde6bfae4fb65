//! JSON file configuration adapter.
//!
//! Implements [`ConfigPort`] over a single JSON document on disk.  Saves go
//! to a sibling temporary file that is then renamed over the target, so a
//! crash mid-write never leaves a truncated config behind.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::ControllerConfig;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "ZONECTL_CONFIG";

/// Used when [`CONFIG_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "zonectl.json";

pub struct JsonFileConfig {
    path: PathBuf,
}

impl JsonFileConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path from `ZONECTL_CONFIG`, else `zonectl.json` in the working directory.
    pub fn from_env() -> Self {
        let path = std::env::var_os(CONFIG_ENV)
            .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigPort for JsonFileConfig {
    fn load(&self) -> Result<ControllerConfig, ConfigError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(ConfigError::NotFound),
            Err(e) => {
                warn!("JsonFileConfig: reading {} failed: {}", self.path.display(), e);
                return Err(ConfigError::IoError);
            }
        };
        let config: ControllerConfig = serde_json::from_str(&text).map_err(|e| {
            warn!("JsonFileConfig: {} is not valid config: {}", self.path.display(), e);
            ConfigError::Corrupted
        })?;
        config.validate()?;
        info!("JsonFileConfig: loaded {}", self.path.display());
        Ok(config)
    }

    fn save(&self, config: &ControllerConfig) -> Result<(), ConfigError> {
        config.validate()?;

        let json = serde_json::to_string_pretty(config).map_err(|_| ConfigError::IoError)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .and_then(|()| fs::rename(&tmp, &self.path))
            .map_err(|e| {
                warn!("JsonFileConfig: writing {} failed: {}", self.path.display(), e);
                let _ = fs::remove_file(&tmp);
                ConfigError::IoError
            })?;
        info!("JsonFileConfig: saved {}", self.path.display());
        Ok(())
    }
}
