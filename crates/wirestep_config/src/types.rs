//! Configuration types deserialized from `wirestep.toml`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default delta-cycle budget per real-time instant.
pub const DEFAULT_MAX_DELTA_CYCLES: u32 = 10_000;

/// Default clock pulse width in system time units.
pub const DEFAULT_PULSE_WIDTH: u64 = 100;

/// The top-level simulation configuration parsed from `wirestep.toml`.
///
/// Every table is optional; an empty file yields [`SimConfig::default`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimConfig {
    /// Run-length and kernel limits.
    #[serde(default)]
    pub simulation: SimulationSection,
    /// Clock generator settings.
    #[serde(default)]
    pub clock: ClockSection,
    /// Waveform trace output.
    #[serde(default)]
    pub trace: TraceSection,
}

/// The `[simulation]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationSection {
    /// Real time at which the run stops, in system time units.
    #[serde(default)]
    pub stop_time: u64,
    /// Delta cycles allowed within one instant before the run is aborted.
    #[serde(default = "default_max_delta_cycles")]
    pub max_delta_cycles: u32,
    /// Unit of one system time step, used for trace timescales.
    #[serde(default)]
    pub time_unit: TimeUnit,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            stop_time: 0,
            max_delta_cycles: DEFAULT_MAX_DELTA_CYCLES,
            time_unit: TimeUnit::default(),
        }
    }
}

fn default_max_delta_cycles() -> u32 {
    DEFAULT_MAX_DELTA_CYCLES
}

/// The `[clock]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClockSection {
    /// Time units between clock transitions.
    #[serde(default = "default_pulse_width")]
    pub pulse_width: u64,
}

impl Default for ClockSection {
    fn default() -> Self {
        Self {
            pulse_width: DEFAULT_PULSE_WIDTH,
        }
    }
}

fn default_pulse_width() -> u64 {
    DEFAULT_PULSE_WIDTH
}

/// The `[trace]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TraceSection {
    /// Path of the VCD file to write. No trace is written when absent.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Physical unit of one system time step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    /// Femtosecond.
    Fs,
    /// Picosecond.
    Ps,
    /// Nanosecond.
    Ns,
    /// Microsecond (default).
    #[default]
    Us,
    /// Millisecond.
    Ms,
    /// Second.
    S,
}

impl TimeUnit {
    /// Returns the VCD `$timescale` suffix for this unit.
    pub fn suffix(self) -> &'static str {
        match self {
            TimeUnit::Fs => "fs",
            TimeUnit::Ps => "ps",
            TimeUnit::Ns => "ns",
            TimeUnit::Us => "us",
            TimeUnit::Ms => "ms",
            TimeUnit::S => "s",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}
