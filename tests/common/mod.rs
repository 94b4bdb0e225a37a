#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use tradesim::domain::backtest::BacktestConfig;
use tradesim::domain::error::TradesimError;
pub use tradesim::domain::ohlcv::PriceBar;
pub use tradesim::domain::signal::Signal;
use tradesim::ports::data_port::DataPort;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(ticker.to_string(), bars);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn load_series(&self, ticker: &str) -> Result<Vec<PriceBar>, TradesimError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(TradesimError::Data {
                reason: reason.clone(),
            });
        }
        self.data
            .get(ticker)
            .cloned()
            .ok_or_else(|| TradesimError::Data {
                reason: format!("no data for {ticker}"),
            })
    }

    fn store_series(&self, _ticker: &str, _bars: &[PriceBar]) -> Result<bool, TradesimError> {
        Ok(false)
    }
}

/// Minute bars starting 2025-05-01 06:30.
pub fn ts(i: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 5, 1)
        .unwrap()
        .and_hms_opt(6, 30, 0)
        .unwrap()
        + Duration::minutes(i as i64)
}

pub fn make_series(prices: &[f64], signals: &[Signal]) -> Vec<PriceBar> {
    assert_eq!(prices.len(), signals.len());
    prices
        .iter()
        .zip(signals)
        .enumerate()
        .map(|(i, (&close, &signal))| PriceBar::from_close(ts(i), close, signal))
        .collect()
}

/// Prices [100, 110, 90, 120] with Enter, Hold, Exit, Hold.
pub fn reference_series() -> Vec<PriceBar> {
    make_series(
        &[100.0, 110.0, 90.0, 120.0],
        &[Signal::Enter, Signal::Hold, Signal::Exit, Signal::Hold],
    )
}

pub fn zero_fee_config() -> BacktestConfig {
    BacktestConfig {
        fee: 0.0,
        ..BacktestConfig::default()
    }
}

pub fn write_file(path: &std::path::Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

pub const REFERENCE_CSV: &str = "timestamp,open,high,low,close,volume,signal\n\
    2025-05-01 06:30:00,100,100,100,100,0,1\n\
    2025-05-01 06:31:00,110,110,110,110,0,0\n\
    2025-05-01 06:32:00,90,90,90,90,0,-1\n\
    2025-05-01 06:33:00,120,120,120,120,0,0\n";
