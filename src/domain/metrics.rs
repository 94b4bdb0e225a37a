//! Performance summary combining trade statistics with equity-curve drawdown.

use chrono::NaiveDateTime;

use super::backtest::BacktestRun;
use super::drawdown::{calculate_drawdowns, DrawdownReport, SeriesKind};
use super::error::TradesimError;
use super::trade_stats::{pair_trades, RoundTrip, TradeStats};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestSummary {
    pub initial_cash: f64,
    pub final_equity: f64,
    /// (final_equity - initial_cash) / initial_cash
    pub total_return: f64,
    pub trade_stats: TradeStats,
    pub round_trips: Vec<RoundTrip>,
    /// Raw price-difference PnL of a position left open at the end. Not part
    /// of `trade_stats`.
    pub unrealized_profit: Option<f64>,
    pub drawdown: DrawdownReport,
}

impl BacktestSummary {
    /// Summarize a completed run.
    ///
    /// Drawdown is taken directly over the equity values so the first bar is
    /// a candidate peak.
    pub fn compute(run: &BacktestRun) -> Result<Self, TradesimError> {
        let round_trips = pair_trades(&run.trades);
        let trade_stats = TradeStats::from_round_trips(&round_trips);

        let equity = run.equity_curve();
        let timestamps: Vec<NaiveDateTime> = run.bars.iter().map(|b| b.bar.timestamp).collect();
        let drawdown = calculate_drawdowns(&equity, Some(&timestamps), SeriesKind::Cumulative)?;

        let final_equity = run.final_equity();
        let total_return = (final_equity - run.initial_cash) / run.initial_cash;

        let unrealized_profit = match (&run.open_position, run.bars.last()) {
            (Some(position), Some(last)) => Some(position.unrealized_pnl(last.bar.close)),
            _ => None,
        };

        Ok(BacktestSummary {
            initial_cash: run.initial_cash,
            final_equity,
            total_return,
            trade_stats,
            round_trips,
            unrealized_profit,
            drawdown,
        })
    }
}

/// Period-over-period fractional change of `values`, one shorter than the input.
///
/// A zero denominator yields a 0 return.
pub fn period_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|w| if w[0] != 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}
