//! Free-running clock sources.

use crate::circuit::Circuit;
use crate::ids::SignalId;

/// A line that toggles every `pulse_width` time units.
///
/// The line starts `Low`; the first toggle happens at `pulse_width`, so the
/// full period is twice the pulse width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Clock {
    line: SignalId,
    pulse_width: u64,
}

impl Clock {
    /// Creates a clock driving `line`. `pulse_width` must be non-zero.
    pub(crate) fn new(line: SignalId, pulse_width: u64) -> Self {
        Self { line, pulse_width }
    }

    /// Returns the driven line.
    pub fn line(&self) -> SignalId {
        self.line
    }

    /// Returns the half-period.
    pub fn pulse_width(&self) -> u64 {
        self.pulse_width
    }

    /// Toggles the line if the current time is on a pulse boundary.
    pub(crate) fn tick(&self, circuit: &mut Circuit) {
        if circuit.time() % self.pulse_width == 0 {
            let next = !circuit.read(self.line);
            circuit.write(self.line, next);
        }
    }
}
