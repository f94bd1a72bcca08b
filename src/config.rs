//! Configuration.
//!
//! Only the device node is configurable. Command codes and payload layouts
//! are fixed by the driver and live in [`crate::abi`].

use std::path::PathBuf;

use serde::Deserialize;

use crate::abi::DEFAULT_DEVICE_PATH;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "picontrol.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "PICONTROL_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "PICONTROL";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "PICONTROL_LOG";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
}

/// Where to find the driver.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Character device node. Defaults to `/dev/piControl0`.
    pub path: PathBuf,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DEVICE_PATH),
        }
    }
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `picontrol.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `PICONTROL_CONFIG` (if set)
    /// 4. Environment variables with `PICONTROL` prefix, e.g.
    ///    `PICONTROL__DEVICE__PATH`
    pub fn load(path: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        Ok(config)
    }
}
