//! JSON configuration file adapter.
//!
//! Implements [`ConfigPort`] and [`ProfileSource`] on top of a single
//! JSON document.  A missing file means "use defaults"; a file that
//! exists but does not parse is reported as corrupted rather than
//! silently replaced.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort, ProfileSource};
use crate::config::SystemConfig;
use crate::error::Error;
use crate::profile::Profile;

pub struct JsonConfigFile {
    path: PathBuf,
}

impl JsonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn validate_config(cfg: &SystemConfig) -> Result<(), ConfigError> {
    cfg.validate().map_err(|e| match e {
        Error::Config(what) => ConfigError::ValidationFailed(what),
        _ => ConfigError::ValidationFailed("invalid configuration"),
    })
}

impl ConfigPort for JsonConfigFile {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("Config: {} not found, using defaults", self.path.display());
                return Ok(SystemConfig::default());
            }
            Err(e) => {
                warn!("Config: cannot read {}: {e}", self.path.display());
                return Err(ConfigError::Io);
            }
        };
        let cfg: SystemConfig = serde_json::from_str(&text).map_err(|e| {
            warn!("Config: {} is not valid JSON: {e}", self.path.display());
            ConfigError::Corrupted
        })?;
        validate_config(&cfg)?;
        info!("Config: loaded {}", self.path.display());
        Ok(cfg)
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let text = serde_json::to_string_pretty(config).map_err(|_| ConfigError::Corrupted)?;
        fs::write(&self.path, text).map_err(|e| {
            warn!("Config: cannot write {}: {e}", self.path.display());
            ConfigError::Io
        })
    }
}

impl ProfileSource for JsonConfigFile {
    /// Falls back to the default profile when the file is unusable.
    fn active_profile(&self) -> Profile {
        self.load().map(|c| c.profile).unwrap_or_default()
    }
}
