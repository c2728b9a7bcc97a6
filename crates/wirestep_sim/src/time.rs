//! Two-level simulation time: real time plus a hidden delta index.
//!
//! [`SimTime`] pairs the real-time instant (in system time units) with the
//! delta cycle reached within that instant. Zero-delay writes are stamped with
//! the next delta so combinational logic settles before real time moves.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A point in simulated time.
///
/// Ordered first by real time, then by delta index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SimTime {
    /// Real time in system time units.
    pub time: u64,
    /// Delta cycle index within the current instant.
    pub delta: u64,
}

impl SimTime {
    /// Time zero, delta zero.
    pub fn zero() -> Self {
        Self { time: 0, delta: 0 }
    }

    /// Creates a time at the start of the given instant.
    pub fn at(time: u64) -> Self {
        Self { time, delta: 0 }
    }

    /// Returns the next delta cycle at the same real time.
    pub fn next_delta(&self) -> Self {
        Self {
            time: self.time,
            delta: self.delta + 1,
        }
    }

    /// Advances to the next real-time instant, resetting the delta counter.
    pub fn next_instant(&self) -> Self {
        Self {
            time: self.time + 1,
            delta: 0,
        }
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time.cmp(&other.time).then(self.delta.cmp(&other.delta))
    }
}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.time)?;
        if self.delta > 0 {
            write!(f, "+d{}", self.delta)?;
        }
        Ok(())
    }
}
