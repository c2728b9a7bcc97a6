//! Simulation error types for the logic simulation kernel.
//!
//! All errors that can occur while building a circuit or running it are
//! represented as variants of [`SimError`].

use std::io;

use wirestep_config::ConfigError;

/// Errors that can occur during circuit construction or simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A bus line was addressed outside its allowed range.
    #[error("index {index} out of range (allowed {lower}..{upper})")]
    IndexOutOfRange {
        /// Lowest valid index.
        lower: usize,
        /// One past the highest valid index.
        upper: usize,
        /// The index that was requested.
        index: usize,
    },

    /// A bit-select range was given with its bounds reversed.
    #[error("invalid range: low index {low} is above high index {high}")]
    InvalidRange {
        /// Requested low index.
        low: usize,
        /// Requested high index.
        high: usize,
    },

    /// No signal carries the requested name.
    #[error("unknown signal '{0}'")]
    UnknownSignal(String),

    /// A clock was requested with a pulse width of zero.
    #[error("clock '{name}' needs a non-zero pulse width")]
    InvalidPulseWidth {
        /// Name of the clock line.
        name: String,
    },

    /// Zero-delay activity did not settle within the delta-cycle budget,
    /// which means the circuit has a combinational loop without delay.
    #[error(
        "delta cycle did not converge at time {time} after {max_deltas} deltas (pending: {pending})",
        pending = .signals.join(", ")
    )]
    DeltaCycleLimit {
        /// The real time at which settling failed.
        time: u64,
        /// The configured delta-cycle budget.
        max_deltas: u32,
        /// Names of the signals still holding zero-delay work.
        signals: Vec<String>,
    },

    /// An I/O error occurred while writing trace data.
    #[error("waveform I/O error: {0}")]
    WaveformIo(#[from] io::Error),

    /// The run configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
