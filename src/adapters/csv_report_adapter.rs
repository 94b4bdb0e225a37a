//! CSV report adapter implementing ReportPort.
//!
//! Writes into the output directory:
//! - `equity.csv`: the input series with an `equity` column appended
//! - `trades.csv`: the trade log
//! - `drawdown.csv`: per-point cumulative, peak and drawdown
//! - `summary.txt`: the rendered text summary

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::adapters::csv_adapter::{SeriesRow, TIMESTAMP_FORMAT};
use crate::adapters::text_summary::format_summary;
use crate::domain::backtest::BacktestRun;
use crate::domain::drawdown::DrawdownReport;
use crate::domain::error::TradesimError;
use crate::domain::metrics::BacktestSummary;
use crate::domain::position::Trade;
use crate::ports::report_port::ReportPort;

#[derive(Serialize)]
struct EquityRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    signal: i64,
    equity: f64,
}

#[derive(Serialize)]
struct TradeRow {
    timestamp: String,
    action: String,
    price: f64,
    shares: f64,
}

#[derive(Serialize)]
struct DrawdownRow {
    timestamp: String,
    cumulative: f64,
    peak: f64,
    drawdown: f64,
}

fn csv_error(e: csv::Error) -> TradesimError {
    TradesimError::Data {
        reason: format!("CSV write error: {e}"),
    }
}

pub fn write_equity<W: Write>(writer: W, run: &BacktestRun) -> Result<(), TradesimError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for eb in &run.bars {
        let bar = SeriesRow::from(&eb.bar);
        wtr.serialize(EquityRow {
            timestamp: bar.timestamp,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            signal: bar.signal,
            equity: eb.equity,
        })
        .map_err(csv_error)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_trades<W: Write>(writer: W, trades: &[Trade]) -> Result<(), TradesimError> {
    let mut wtr = csv::Writer::from_writer(writer);
    if trades.is_empty() {
        wtr.write_record(["timestamp", "action", "price", "shares"])
            .map_err(csv_error)?;
    }
    for trade in trades {
        wtr.serialize(TradeRow {
            timestamp: trade.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            action: trade.action.to_string(),
            price: trade.price,
            shares: trade.shares,
        })
        .map_err(csv_error)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_drawdown<W: Write>(writer: W, report: &DrawdownReport) -> Result<(), TradesimError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for (i, point) in report.series.iter().enumerate() {
        wtr.serialize(DrawdownRow {
            timestamp: point
                .timestamp
                .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
                .unwrap_or_else(|| i.to_string()),
            cumulative: point.cumulative,
            peak: point.peak,
            drawdown: point.drawdown,
        })
        .map_err(csv_error)?;
    }
    wtr.flush()?;
    Ok(())
}

pub struct CsvReportAdapter;

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        run: &BacktestRun,
        summary: &BacktestSummary,
        output_dir: &str,
    ) -> Result<(), TradesimError> {
        let dir = Path::new(output_dir);
        fs::create_dir_all(dir)?;

        write_equity(fs::File::create(dir.join("equity.csv"))?, run)?;
        write_trades(fs::File::create(dir.join("trades.csv"))?, &run.trades)?;
        write_drawdown(fs::File::create(dir.join("drawdown.csv"))?, &summary.drawdown)?;
        fs::write(dir.join("summary.txt"), format_summary(summary))?;

        info!(dir = %dir.display(), "report written");
        Ok(())
    }
}
