//! YAML file adapter for [`ConfigPort`].
//!
//! A missing file is not an error: the monitor runs on defaults and says
//! so in the log. A file that exists but does not parse is
//! [`ConfigError::Corrupted`]; the caller decides whether that is fatal.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::SystemConfig;

pub struct YamlConfigFile {
    path: PathBuf,
}

impl YamlConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigPort for YamlConfigFile {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("{}: not found, using defaults", self.path.display());
                return Ok(SystemConfig::default());
            }
            Err(e) => {
                warn!("{}: {}", self.path.display(), e);
                return Err(ConfigError::IoError);
            }
        };

        // An empty document deserializes as unit, not as a struct.
        if text.trim().is_empty() {
            return Ok(SystemConfig::default());
        }

        let config: SystemConfig = serde_yaml::from_str(&text).map_err(|e| {
            warn!("{}: {}", self.path.display(), e);
            ConfigError::Corrupted
        })?;
        config.validate()?;
        info!("loaded config from {}", self.path.display());
        Ok(config)
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let text = serde_yaml::to_string(config).map_err(|_| ConfigError::IoError)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|_| ConfigError::IoError)?;
        }
        fs::write(&self.path, text).map_err(|_| ConfigError::IoError)?;
        info!("config saved to {}", self.path.display());
        Ok(())
    }
}
