//! Open position and trade log records.

use chrono::NaiveDateTime;
use std::fmt;

/// The single open lot held while the engine is Long.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub entry_price: f64,
    pub shares: f64,
    pub entry_timestamp: NaiveDateTime,
}

impl Position {
    pub fn market_value(&self, price: f64) -> f64 {
        self.shares * price
    }

    /// Raw price-difference PnL, fees excluded.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.shares * (price - self.entry_price)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeAction {
    Buy,
    Sell,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "BUY"),
            TradeAction::Sell => write!(f, "SELL"),
        }
    }
}

/// One fill in the trade log. Appended, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub timestamp: NaiveDateTime,
    pub action: TradeAction,
    pub price: f64,
    pub shares: f64,
}

impl Trade {
    pub fn buy(timestamp: NaiveDateTime, price: f64, shares: f64) -> Self {
        Trade {
            timestamp,
            action: TradeAction::Buy,
            price,
            shares,
        }
    }

    pub fn sell(timestamp: NaiveDateTime, price: f64, shares: f64) -> Self {
        Trade {
            timestamp,
            action: TradeAction::Sell,
            price,
            shares,
        }
    }

    pub fn notional(&self) -> f64 {
        self.price * self.shares
    }
}
