//! Parsing and validation of `wirestep.toml` simulation settings.
//!
//! This crate reads the run configuration (stop time, delta-cycle budget,
//! time unit, clock pulse width, trace output) into a strongly-typed
//! [`SimConfig`].

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{
    load_config, load_config_file, load_config_from_str, load_config_or_default, CONFIG_FILE_NAME,
};
pub use types::*;
