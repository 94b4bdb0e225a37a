//! Discrete per-bar trading signal.

use std::fmt;

use super::error::TradesimError;

/// Instruction attached to each bar by an upstream signal generator.
///
/// Encoded in input data as `1` (enter), `-1` (exit) and `0` (hold).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Signal {
    Enter,
    Exit,
    #[default]
    Hold,
}

impl Signal {
    pub fn as_i64(self) -> i64 {
        match self {
            Signal::Enter => 1,
            Signal::Exit => -1,
            Signal::Hold => 0,
        }
    }
}

impl TryFrom<i64> for Signal {
    type Error = TradesimError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Signal::Enter),
            -1 => Ok(Signal::Exit),
            0 => Ok(Signal::Hold),
            other => Err(TradesimError::invalid_input(format!(
                "signal must be one of -1, 0, 1 (got {other})"
            ))),
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Enter => write!(f, "ENTER"),
            Signal::Exit => write!(f, "EXIT"),
            Signal::Hold => write!(f, "HOLD"),
        }
    }
}
