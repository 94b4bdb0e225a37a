//! Signal-annotated OHLCV bar representation.

use chrono::NaiveDateTime;

use super::error::TradesimError;
use super::signal::Signal;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub signal: Signal,
}

impl PriceBar {
    /// Bar carrying only what the engine reads; open/high/low collapse to the close.
    pub fn from_close(timestamp: NaiveDateTime, close: f64, signal: Signal) -> Self {
        PriceBar {
            timestamp,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
            signal,
        }
    }
}

/// A bar of the backtested series with its mark-to-market equity appended.
#[derive(Debug, Clone, PartialEq)]
pub struct EquityBar {
    pub bar: PriceBar,
    pub equity: f64,
}

/// Check the invariants the engine relies on: a non-empty series of positive,
/// finite closes, optionally in non-decreasing timestamp order.
///
/// The series is never re-sorted; ordering is the caller's responsibility.
pub fn validate_series(bars: &[PriceBar], check_order: bool) -> Result<(), TradesimError> {
    if bars.is_empty() {
        return Err(TradesimError::invalid_input("price series is empty"));
    }

    for (i, bar) in bars.iter().enumerate() {
        if !bar.close.is_finite() || bar.close <= 0.0 {
            return Err(TradesimError::invalid_input(format!(
                "bar {i} at {}: close must be a positive number (got {})",
                bar.timestamp, bar.close
            )));
        }
    }

    if check_order {
        if let Some(i) = bars
            .windows(2)
            .position(|w| w[1].timestamp < w[0].timestamp)
        {
            return Err(TradesimError::invalid_input(format!(
                "timestamps are not monotonic: {} follows {} at bar {}",
                bars[i + 1].timestamp,
                bars[i].timestamp,
                i + 1
            )));
        }
    }

    Ok(())
}
