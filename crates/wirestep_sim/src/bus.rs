//! Ordered groups of signal lines.
//!
//! A [`Bus`] is only an addressing aid: it holds signal handles, index 0 being
//! the least-significant line. Copying a bus aliases its lines; reads and
//! writes go through the [`Circuit`](crate::circuit::Circuit).

use crate::error::SimError;
use crate::ids::SignalId;

/// An ordered collection of signal handles.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Bus {
    lines: Vec<SignalId>,
}

impl Bus {
    /// Creates a bus over the given lines, least-significant first.
    pub fn new(lines: Vec<SignalId>) -> Self {
        Self { lines }
    }

    /// Returns the number of lines.
    pub fn width(&self) -> usize {
        self.lines.len()
    }

    /// Returns `true` if the bus has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns the lines, least-significant first.
    pub fn lines(&self) -> &[SignalId] {
        &self.lines
    }

    /// Returns the line at `index`.
    pub fn line(&self, index: usize) -> Result<SignalId, SimError> {
        self.lines
            .get(index)
            .copied()
            .ok_or(SimError::IndexOutOfRange {
                lower: 0,
                upper: self.lines.len(),
                index,
            })
    }

    /// Returns the sub-bus `low..=high`, sharing lines with this bus.
    pub fn select(&self, low: usize, high: usize) -> Result<Bus, SimError> {
        if low > high {
            return Err(SimError::InvalidRange { low, high });
        }
        self.line(high)?;
        Ok(Bus::new(self.lines[low..=high].to_vec()))
    }

    /// Returns a new bus with `upper`'s lines placed above this bus's lines.
    pub fn concat(&self, upper: &Bus) -> Bus {
        let mut lines = self.lines.clone();
        lines.extend_from_slice(&upper.lines);
        Bus::new(lines)
    }

    /// Iterates over the lines, least-significant first.
    pub fn iter(&self) -> impl Iterator<Item = SignalId> + '_ {
        self.lines.iter().copied()
    }
}

impl From<SignalId> for Bus {
    fn from(line: SignalId) -> Self {
        Bus::new(vec![line])
    }
}

impl FromIterator<SignalId> for Bus {
    fn from_iter<T: IntoIterator<Item = SignalId>>(iter: T) -> Self {
        Bus::new(iter.into_iter().collect())
    }
}
