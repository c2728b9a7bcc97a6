//! Four-state logic values carried by simulation lines, with truth-table operators.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};

/// The state of a single logic line.
///
/// - `Low`: driven 0
/// - `High`: driven 1
/// - `Unknown`: uninitialized or conflicting
/// - `HighZ`: high-impedance (not driven)
///
/// Lines start out `Unknown` unless created with an explicit initial value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum LogicValue {
    /// Logic low (0).
    Low = 0,
    /// Logic high (1).
    High = 1,
    /// Unknown or uninitialized.
    #[default]
    Unknown = 2,
    /// High-impedance.
    HighZ = 3,
}

impl LogicValue {
    /// Converts a character to a [`LogicValue`].
    ///
    /// Accepts '0', '1', 'x'/'X', and 'z'/'Z'.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(LogicValue::Low),
            '1' => Some(LogicValue::High),
            'x' | 'X' => Some(LogicValue::Unknown),
            'z' | 'Z' => Some(LogicValue::HighZ),
            _ => None,
        }
    }

    /// Returns the trace character for this value: '0', '1', 'x' or 'z'.
    pub fn to_char(self) -> char {
        match self {
            LogicValue::Low => '0',
            LogicValue::High => '1',
            LogicValue::Unknown => 'x',
            LogicValue::HighZ => 'z',
        }
    }

    /// Maps a boolean onto `High`/`Low`.
    pub fn from_bool(b: bool) -> Self {
        if b {
            LogicValue::High
        } else {
            LogicValue::Low
        }
    }

    /// Returns `Some(bool)` for `High`/`Low` and `None` for `Unknown`/`HighZ`.
    pub fn to_bool(self) -> Option<bool> {
        match self {
            LogicValue::Low => Some(false),
            LogicValue::High => Some(true),
            LogicValue::Unknown | LogicValue::HighZ => None,
        }
    }

    /// Returns `true` for `High` and `Low`.
    pub fn is_known(self) -> bool {
        matches!(self, LogicValue::Low | LogicValue::High)
    }
}

impl From<bool> for LogicValue {
    fn from(b: bool) -> Self {
        Self::from_bool(b)
    }
}

impl fmt::Display for LogicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// AND truth table:
/// ```text
///     0  1  x  z
/// 0 | 0  0  0  0
/// 1 | 0  1  x  x
/// x | 0  x  x  x
/// z | 0  x  x  x
/// ```
impl BitAnd for LogicValue {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        use LogicValue::*;
        match (self, rhs) {
            (Low, _) | (_, Low) => Low,
            (High, High) => High,
            _ => Unknown,
        }
    }
}

/// OR truth table:
/// ```text
///     0  1  x  z
/// 0 | 0  1  x  x
/// 1 | 1  1  1  1
/// x | x  1  x  x
/// z | x  1  x  x
/// ```
impl BitOr for LogicValue {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        use LogicValue::*;
        match (self, rhs) {
            (High, _) | (_, High) => High,
            (Low, Low) => Low,
            _ => Unknown,
        }
    }
}

/// XOR truth table:
/// ```text
///     0  1  x  z
/// 0 | 0  1  x  x
/// 1 | 1  0  x  x
/// x | x  x  x  x
/// z | x  x  x  x
/// ```
impl BitXor for LogicValue {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self {
        use LogicValue::*;
        match (self, rhs) {
            (Low, Low) | (High, High) => Low,
            (Low, High) | (High, Low) => High,
            _ => Unknown,
        }
    }
}

/// NOT swaps `Low` and `High`; `Unknown` and `HighZ` pass through unchanged.
impl Not for LogicValue {
    type Output = Self;

    fn not(self) -> Self {
        use LogicValue::*;
        match self {
            Low => High,
            High => Low,
            other => other,
        }
    }
}
