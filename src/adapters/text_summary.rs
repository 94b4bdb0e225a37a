//! Plain-text rendering of a backtest summary.
//!
//! Monetary values and percentages are rounded to two decimals for display
//! only; the underlying summary keeps full precision.

use crate::adapters::csv_adapter::TIMESTAMP_FORMAT;
use crate::domain::drawdown::{DrawdownMark, DrawdownReport};
use crate::domain::metrics::BacktestSummary;

fn mark(m: &DrawdownMark) -> String {
    match m.timestamp {
        Some(ts) => ts.format(TIMESTAMP_FORMAT).to_string(),
        None => format!("bar {}", m.index),
    }
}

pub fn format_drawdown(report: &DrawdownReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("Max Drawdown:       {:.2}%\n", report.max_drawdown * 100.0));
    out.push_str(&format!("Drawdown Duration:  {}\n", report.duration));
    out.push_str(&format!("Drawdown Start:     {}\n", mark(&report.start)));
    out.push_str(&format!("Drawdown End:       {}\n", mark(&report.end)));
    out
}

pub fn format_summary(summary: &BacktestSummary) -> String {
    let stats = &summary.trade_stats;
    let mut out = String::new();

    out.push_str("=== Backtest Results ===\n");
    out.push_str(&format!("Initial Cash:       {:.2}\n", summary.initial_cash));
    out.push_str(&format!("Final Equity:       {:.2}\n", summary.final_equity));
    out.push_str(&format!("Total Return:       {:.2}%\n", summary.total_return * 100.0));
    out.push_str(&format!("Total Profit:       {:.2}\n", stats.total_profit));
    out.push_str(&format!("Number of Trades:   {}\n", stats.number_of_trades));
    out.push_str(&format!("Average Profit:     {:.2}\n", stats.average_profit));
    out.push_str(&format!("Win Rate:           {:.2}%\n", stats.win_rate));
    if let Some(unrealized) = summary.unrealized_profit {
        out.push_str(&format!("Open Position PnL:  {:.2} (not in trade stats)\n", unrealized));
    }
    out.push_str(&format_drawdown(&summary.drawdown));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::drawdown::{calculate_drawdowns, SeriesKind};
    use crate::domain::trade_stats::TradeStats;

    fn sample_summary(unrealized: Option<f64>) -> BacktestSummary {
        BacktestSummary {
            initial_cash: 10_000.0,
            final_equity: 9_000.0,
            total_return: -0.1,
            trade_stats: TradeStats {
                total_profit: -1_000.0,
                number_of_trades: 1,
                average_profit: -1_000.0,
                win_rate: 0.0,
            },
            round_trips: Vec::new(),
            unrealized_profit: unrealized,
            drawdown: calculate_drawdowns(
                &[10_000.0, 11_000.0, 9_000.0],
                None,
                SeriesKind::Cumulative,
            )
            .unwrap(),
        }
    }

    #[test]
    fn summary_lists_statistics() {
        let text = format_summary(&sample_summary(None));
        assert!(text.contains("Total Profit:       -1000.00"));
        assert!(text.contains("Number of Trades:   1"));
        assert!(text.contains("Win Rate:           0.00%"));
        assert!(text.contains("Max Drawdown:       -18.18%"));
        assert!(text.contains("Drawdown Duration:  1 bar"));
        assert!(text.contains("Drawdown Start:     bar 1"));
        assert!(!text.contains("Open Position"));
    }

    #[test]
    fn summary_has_one_line_per_field() {
        let text = format_summary(&sample_summary(None));
        assert!(text.ends_with('\n'));
        assert_eq!(text.lines().count(), 12);
        assert_eq!(text.lines().next(), Some("=== Backtest Results ==="));
    }

    #[test]
    fn summary_mentions_open_position() {
        let text = format_summary(&sample_summary(Some(250.0)));
        assert!(text.contains("Open Position PnL:  250.00"));
    }
}
