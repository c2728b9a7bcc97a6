//! Locating, parsing and validating `wirestep.toml`.

use std::io;
use std::path::Path;

use crate::error::ConfigError;
use crate::types::SimConfig;

/// Name of the configuration file looked up by [`load_config`].
pub const CONFIG_FILE_NAME: &str = "wirestep.toml";

/// Loads `wirestep.toml` from a project directory.
pub fn load_config(project_dir: &Path) -> Result<SimConfig, ConfigError> {
    load_config_file(&project_dir.join(CONFIG_FILE_NAME))
}

/// Loads `wirestep.toml` from a project directory, falling back to
/// [`SimConfig::default`] when the file does not exist.
pub fn load_config_or_default(project_dir: &Path) -> Result<SimConfig, ConfigError> {
    match load_config(project_dir) {
        Err(ConfigError::NotFound(_)) => Ok(SimConfig::default()),
        other => other,
    }
}

/// Loads a configuration from an explicit file path.
pub fn load_config_file(path: &Path) -> Result<SimConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::NotFound(path.to_path_buf())
        } else {
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration held in memory.
pub fn load_config_from_str(content: &str) -> Result<SimConfig, ConfigError> {
    let config: SimConfig =
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &SimConfig) -> Result<(), ConfigError> {
    if config.clock.pulse_width == 0 {
        return Err(ConfigError::Invalid {
            field: "clock.pulse_width",
            reason: "a clock needs a non-zero pulse width".to_string(),
        });
    }
    if config.simulation.max_delta_cycles == 0 {
        return Err(ConfigError::Invalid {
            field: "simulation.max_delta_cycles",
            reason: "at least one delta round per instant is required".to_string(),
        });
    }
    Ok(())
}
