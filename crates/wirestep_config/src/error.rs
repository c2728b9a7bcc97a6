//! Errors raised while loading `wirestep.toml`.

use std::io;
use std::path::PathBuf;

/// Errors that can occur when loading or validating a run configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No configuration file exists at the given path.
    #[error("no configuration file at {}", .0.display())]
    NotFound(PathBuf),

    /// The file exists but could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// The file being read.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The TOML content could not be parsed into a [`SimConfig`](crate::SimConfig).
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// A setting is out of the range the kernel accepts.
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// Dotted key of the offending setting, e.g. `clock.pulse_width`.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}
