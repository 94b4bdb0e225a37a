//! Trade log pairing and profit statistics.
//!
//! Buys and sells are paired first-in first-out. The pairing relies on the
//! engine holding at most one position, so fills strictly alternate. Profit is
//! the raw close-price difference times the lot's shares; fees are already
//! reflected in the equity curve and are not subtracted here.

use super::position::{Trade, TradeAction};

/// A Buy matched with the Sell that closed it.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundTrip {
    pub entry: Trade,
    pub exit: Trade,
    /// exit price - entry price
    pub price_change: f64,
    /// price_change * entry shares
    pub profit: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeStats {
    pub total_profit: f64,
    pub number_of_trades: usize,
    pub average_profit: f64,
    /// Percentage of round trips with positive profit, 0–100.
    pub win_rate: f64,
}

/// Pair each Buy with the next Sell.
///
/// A trailing Buy with no Sell (position still open) is left out, as is a Sell
/// with no open Buy.
pub fn pair_trades(trades: &[Trade]) -> Vec<RoundTrip> {
    let mut open: Option<&Trade> = None;
    let mut pairs = Vec::new();

    for trade in trades {
        match trade.action {
            TradeAction::Buy => open = Some(trade),
            TradeAction::Sell => {
                if let Some(entry) = open.take() {
                    let price_change = trade.price - entry.price;
                    pairs.push(RoundTrip {
                        entry: entry.clone(),
                        exit: trade.clone(),
                        price_change,
                        profit: price_change * entry.shares,
                    });
                }
            }
        }
    }

    pairs
}

impl TradeStats {
    pub fn compute(trades: &[Trade]) -> Self {
        Self::from_round_trips(&pair_trades(trades))
    }

    pub fn from_round_trips(round_trips: &[RoundTrip]) -> Self {
        let number_of_trades = round_trips.len();
        let total_profit: f64 = round_trips.iter().map(|rt| rt.profit).sum();
        let wins = round_trips.iter().filter(|rt| rt.profit > 0.0).count();

        let (average_profit, win_rate) = if number_of_trades > 0 {
            (
                total_profit / number_of_trades as f64,
                wins as f64 / number_of_trades as f64 * 100.0,
            )
        } else {
            (0.0, 0.0)
        };

        TradeStats {
            total_profit,
            number_of_trades,
            average_profit,
            win_rate,
        }
    }
}
