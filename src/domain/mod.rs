//! Core domain types and logic. No I/O.

pub mod signal;
pub mod ohlcv;
pub mod position;
pub mod execution;
pub mod backtest;
pub mod drawdown;
pub mod trade_stats;
pub mod metrics;
pub mod config_validation;
pub mod error;
