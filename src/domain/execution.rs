//! Fill simulation with multiplicative transaction fees.
//!
//! The fee is charged as a fraction of the cash being converted, on entry and
//! again on exit. A full round trip at an unchanged price therefore returns
//! `cash * (1 - fee)^2`.

use std::fmt;
use std::str::FromStr;

use super::error::TradesimError;

/// How many shares an entry buys with the available cash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sizing {
    /// Invest all cash; shares may be fractional and no cash remains.
    #[default]
    Fractional,
    /// Buy whole shares only; the unspent remainder stays in cash.
    WholeShares,
}

impl FromStr for Sizing {
    type Err = TradesimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fractional" | "exact" => Ok(Sizing::Fractional),
            "whole" | "whole_shares" | "floor" => Ok(Sizing::WholeShares),
            other => Err(TradesimError::invalid_config(
                "sizing",
                format!("unknown sizing mode '{other}' (expected fractional or whole)"),
            )),
        }
    }
}

impl fmt::Display for Sizing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sizing::Fractional => write!(f, "fractional"),
            Sizing::WholeShares => write!(f, "whole"),
        }
    }
}

/// Result of an entry attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryResult {
    Entered {
        shares: f64,
        cost: f64,
        fee_paid: f64,
        remaining_cash: f64,
    },
    InsufficientCapital,
}

/// Result of liquidating a position.
#[derive(Debug, Clone, PartialEq)]
pub struct ExitResult {
    pub proceeds: f64,
    pub fee_paid: f64,
}

/// Convert `cash` into shares at `price`.
///
/// The fee is taken from the cash before conversion, so shares are
/// `cash * (1 - fee) / price` rather than `cash / (price * (1 + fee))`, and a
/// round trip at an unchanged price returns exactly `cash * (1 - fee)^2`.
/// `price * shares + fee_paid` never exceeds `cash`.
pub fn enter_long(cash: f64, price: f64, fee: f64, sizing: Sizing) -> EntryResult {
    let investable = cash * (1.0 - fee);

    match sizing {
        Sizing::Fractional => {
            let shares = investable / price;
            if shares <= 0.0 {
                return EntryResult::InsufficientCapital;
            }
            EntryResult::Entered {
                shares,
                cost: shares * price,
                fee_paid: cash * fee,
                remaining_cash: 0.0,
            }
        }
        Sizing::WholeShares => {
            let shares = (investable / price).floor();
            if shares < 1.0 {
                return EntryResult::InsufficientCapital;
            }
            let cost = shares * price;
            let gross = cost / (1.0 - fee);
            EntryResult::Entered {
                shares,
                cost,
                fee_paid: gross - cost,
                remaining_cash: (cash - gross).max(0.0),
            }
        }
    }
}

/// proceeds = shares * price * (1 - fee)
pub fn exit_long(shares: f64, price: f64, fee: f64) -> ExitResult {
    let notional = shares * price;
    ExitResult {
        proceeds: notional * (1.0 - fee),
        fee_paid: notional * fee,
    }
}
