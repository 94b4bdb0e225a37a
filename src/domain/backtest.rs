//! Backtest engine: a two-state (Flat/Long) machine over a signal-annotated series.
//!
//! Each bar is processed by the pure transition [`step`], which takes the
//! current state and a bar and yields the next state, an optional fill and the
//! bar's mark-to-market equity. [`Backtester::run`] folds it over the series.

use tracing::{debug, info};

use super::error::TradesimError;
use super::execution::{self, EntryResult, Sizing};
use super::ohlcv::{validate_series, EquityBar, PriceBar};
use super::position::{Position, Trade};
use super::signal::Signal;

pub const DEFAULT_INITIAL_CASH: f64 = 10_000.0;
pub const DEFAULT_FEE: f64 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_cash: f64,
    /// Fraction of converted cash charged on each fill, in [0, 1).
    pub fee: f64,
    pub sizing: Sizing,
    pub validate_timestamps: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_cash: DEFAULT_INITIAL_CASH,
            fee: DEFAULT_FEE,
            sizing: Sizing::Fractional,
            validate_timestamps: true,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), TradesimError> {
        if !self.initial_cash.is_finite() || self.initial_cash <= 0.0 {
            return Err(TradesimError::invalid_config(
                "initial_cash",
                format!("initial_cash must be positive (got {})", self.initial_cash),
            ));
        }
        if !self.fee.is_finite() || !(0.0..1.0).contains(&self.fee) {
            return Err(TradesimError::invalid_config(
                "fee",
                format!("fee must be in [0, 1) (got {})", self.fee),
            ));
        }
        Ok(())
    }
}

/// Cash and position state carried between bars.
///
/// `cash` while Long is the remainder left by whole-share sizing; it is zero
/// under fractional sizing.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineState {
    Flat { cash: f64 },
    Long { position: Position, cash: f64 },
}

impl EngineState {
    pub fn initial(config: &BacktestConfig) -> Self {
        EngineState::Flat {
            cash: config.initial_cash,
        }
    }

    /// Mark-to-market value at `price`.
    pub fn equity(&self, price: f64) -> f64 {
        match self {
            EngineState::Flat { cash } => *cash,
            EngineState::Long { position, cash } => cash + position.market_value(price),
        }
    }

    pub fn cash(&self) -> f64 {
        match self {
            EngineState::Flat { cash } | EngineState::Long { cash, .. } => *cash,
        }
    }

    pub fn position(&self) -> Option<&Position> {
        match self {
            EngineState::Flat { .. } => None,
            EngineState::Long { position, .. } => Some(position),
        }
    }

    pub fn is_long(&self) -> bool {
        matches!(self, EngineState::Long { .. })
    }
}

/// Outcome of processing a single bar.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub state: EngineState,
    pub trade: Option<Trade>,
    pub equity: f64,
}

/// Apply one bar to `state`.
///
/// Enter while Flat buys, Exit while Long sells. Every other combination
/// leaves the state untouched and records nothing.
pub fn step(state: EngineState, bar: &PriceBar, config: &BacktestConfig) -> Step {
    let price = bar.close;

    let (state, trade) = match (state, bar.signal) {
        (EngineState::Flat { cash }, Signal::Enter) => {
            match execution::enter_long(cash, price, config.fee, config.sizing) {
                EntryResult::Entered {
                    shares,
                    fee_paid,
                    remaining_cash,
                    ..
                } => {
                    debug!(
                        timestamp = %bar.timestamp,
                        price,
                        shares,
                        fee_paid,
                        "entered long"
                    );
                    let position = Position {
                        entry_price: price,
                        shares,
                        entry_timestamp: bar.timestamp,
                    };
                    (
                        EngineState::Long {
                            position,
                            cash: remaining_cash,
                        },
                        Some(Trade::buy(bar.timestamp, price, shares)),
                    )
                }
                EntryResult::InsufficientCapital => {
                    debug!(
                        timestamp = %bar.timestamp,
                        price,
                        cash,
                        "entry skipped: insufficient capital"
                    );
                    (EngineState::Flat { cash }, None)
                }
            }
        }
        (EngineState::Long { position, cash }, Signal::Exit) => {
            let exit = execution::exit_long(position.shares, price, config.fee);
            debug!(
                timestamp = %bar.timestamp,
                price,
                shares = position.shares,
                proceeds = exit.proceeds,
                fee_paid = exit.fee_paid,
                "exited long"
            );
            (
                EngineState::Flat {
                    cash: cash + exit.proceeds,
                },
                Some(Trade::sell(bar.timestamp, price, position.shares)),
            )
        }
        (state, _) => (state, None),
    };

    let equity = state.equity(price);
    Step {
        state,
        trade,
        equity,
    }
}

/// Everything a single run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestRun {
    pub initial_cash: f64,
    /// Input series with per-bar equity; same length as the input.
    pub bars: Vec<EquityBar>,
    pub trades: Vec<Trade>,
    /// Position still open after the last bar. It is marked to market in the
    /// final equity but no closing Sell is recorded.
    pub open_position: Option<Position>,
    pub final_cash: f64,
}

impl BacktestRun {
    pub fn equity_curve(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.equity).collect()
    }

    pub fn final_equity(&self) -> f64 {
        self.bars
            .last()
            .map(|b| b.equity)
            .unwrap_or(self.initial_cash)
    }
}

/// Engine bound to one series and one configuration.
pub struct Backtester<'a> {
    config: BacktestConfig,
    bars: &'a [PriceBar],
}

impl<'a> Backtester<'a> {
    /// Fails fast on an invalid configuration, before any data is touched.
    pub fn new(config: BacktestConfig, bars: &'a [PriceBar]) -> Result<Self, TradesimError> {
        config.validate()?;
        Ok(Backtester { config, bars })
    }

    pub fn run(&self) -> Result<BacktestRun, TradesimError> {
        validate_series(self.bars, self.config.validate_timestamps)?;

        info!(
            bars = self.bars.len(),
            initial_cash = self.config.initial_cash,
            fee = self.config.fee,
            sizing = %self.config.sizing,
            "starting backtest"
        );

        let mut state = EngineState::initial(&self.config);
        let mut equity_bars = Vec::with_capacity(self.bars.len());
        let mut trades = Vec::new();

        for bar in self.bars {
            let next = step(state, bar, &self.config);
            if let Some(trade) = next.trade {
                trades.push(trade);
            }
            equity_bars.push(EquityBar {
                bar: bar.clone(),
                equity: next.equity,
            });
            state = next.state;
        }

        let final_cash = state.cash();
        let open_position = match state {
            EngineState::Long { position, .. } => Some(position),
            EngineState::Flat { .. } => None,
        };

        info!(
            trades = trades.len(),
            open_position = open_position.is_some(),
            final_equity = equity_bars.last().map(|b| b.equity).unwrap_or(final_cash),
            "backtest complete"
        );

        Ok(BacktestRun {
            initial_cash: self.config.initial_cash,
            bars: equity_bars,
            trades,
            open_position,
            final_cash,
        })
    }
}

/// Validate `config`, then run it over `bars`.
pub fn run_backtest(
    bars: &[PriceBar],
    config: &BacktestConfig,
) -> Result<BacktestRun, TradesimError> {
    Backtester::new(config.clone(), bars)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::TradeAction;
    use approx::assert_relative_eq;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(i: usize) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, 1)
            .unwrap()
            .and_hms_opt(6, 30, 0)
            .unwrap()
            + chrono::Duration::minutes(i as i64)
    }

    fn series(prices: &[f64], signals: &[Signal]) -> Vec<PriceBar> {
        prices
            .iter()
            .zip(signals)
            .enumerate()
            .map(|(i, (&p, &s))| PriceBar::from_close(ts(i), p, s))
            .collect()
    }

    fn zero_fee() -> BacktestConfig {
        BacktestConfig {
            fee: 0.0,
            ..BacktestConfig::default()
        }
    }

    #[test]
    fn default_config() {
        let c = BacktestConfig::default();
        assert_relative_eq!(c.initial_cash, 10_000.0);
        assert_relative_eq!(c.fee, 0.01);
        assert_eq!(c.sizing, Sizing::Fractional);
        assert!(c.validate_timestamps);
    }

    #[test]
    fn config_rejects_non_positive_cash() {
        for cash in [0.0, -1.0, f64::NAN] {
            let c = BacktestConfig {
                initial_cash: cash,
                ..BacktestConfig::default()
            };
            assert!(matches!(
                c.validate(),
                Err(TradesimError::InvalidConfiguration { .. })
            ));
        }
    }

    #[test]
    fn config_rejects_fee_out_of_range() {
        for fee in [-0.01, 1.0, 1.5] {
            let c = BacktestConfig {
                fee,
                ..BacktestConfig::default()
            };
            assert!(c.validate().is_err(), "fee {fee} should be rejected");
        }
        let c = BacktestConfig {
            fee: 0.0,
            ..BacktestConfig::default()
        };
        assert!(c.validate().is_ok());
    }

    #[test]
    fn invalid_config_fails_before_run() {
        let bars = series(&[100.0], &[Signal::Hold]);
        let c = BacktestConfig {
            fee: 1.0,
            ..BacktestConfig::default()
        };
        assert!(Backtester::new(c, &bars).is_err());
    }

    #[test]
    fn step_flat_enter_buys() {
        let bar = PriceBar::from_close(ts(0), 100.0, Signal::Enter);
        let out = step(EngineState::Flat { cash: 10_000.0 }, &bar, &zero_fee());
        assert!(out.state.is_long());
        assert_eq!(out.trade, Some(Trade::buy(ts(0), 100.0, 100.0)));
        assert_relative_eq!(out.equity, 10_000.0);
        assert_relative_eq!(out.state.position().unwrap().shares, 100.0);
    }

    #[test]
    fn step_long_exit_sells() {
        let state = EngineState::Long {
            position: Position {
                entry_price: 100.0,
                shares: 100.0,
                entry_timestamp: ts(0),
            },
            cash: 0.0,
        };
        let bar = PriceBar::from_close(ts(1), 90.0, Signal::Exit);
        let out = step(state, &bar, &zero_fee());
        assert_eq!(out.state, EngineState::Flat { cash: 9_000.0 });
        assert_eq!(out.trade.unwrap().action, TradeAction::Sell);
        assert_relative_eq!(out.equity, 9_000.0);
    }

    #[test]
    fn step_quiet_transitions() {
        let flat = EngineState::Flat { cash: 500.0 };
        for signal in [Signal::Exit, Signal::Hold] {
            let bar = PriceBar::from_close(ts(0), 10.0, signal);
            let out = step(flat.clone(), &bar, &zero_fee());
            assert_eq!(out.state, flat);
            assert!(out.trade.is_none());
        }

        let long = EngineState::Long {
            position: Position {
                entry_price: 10.0,
                shares: 5.0,
                entry_timestamp: ts(0),
            },
            cash: 0.0,
        };
        for signal in [Signal::Enter, Signal::Hold] {
            let bar = PriceBar::from_close(ts(1), 12.0, signal);
            let out = step(long.clone(), &bar, &zero_fee());
            assert_eq!(out.state, long);
            assert!(out.trade.is_none());
            assert_relative_eq!(out.equity, 60.0);
        }
    }

    #[test]
    fn step_is_foldable() {
        let bars = series(
            &[100.0, 110.0, 90.0, 120.0],
            &[Signal::Enter, Signal::Hold, Signal::Exit, Signal::Hold],
        );
        let config = zero_fee();
        let (state, curve) = bars.iter().fold(
            (EngineState::initial(&config), Vec::new()),
            |(state, mut curve), bar| {
                let out = step(state, bar, &config);
                curve.push(out.equity);
                (out.state, curve)
            },
        );
        assert_eq!(state, EngineState::Flat { cash: 9_000.0 });
        assert_eq!(curve, vec![10_000.0, 11_000.0, 9_000.0, 9_000.0]);
    }

    #[test]
    fn reference_scenario() {
        let bars = series(
            &[100.0, 110.0, 90.0, 120.0],
            &[Signal::Enter, Signal::Hold, Signal::Exit, Signal::Hold],
        );
        let run = run_backtest(&bars, &zero_fee()).unwrap();

        assert_eq!(run.equity_curve(), vec![10_000.0, 11_000.0, 9_000.0, 9_000.0]);
        assert_eq!(
            run.trades,
            vec![Trade::buy(ts(0), 100.0, 100.0), Trade::sell(ts(2), 90.0, 100.0)]
        );
        assert!(run.open_position.is_none());
        assert_relative_eq!(run.final_cash, 9_000.0);
    }

    #[test]
    fn all_hold_keeps_initial_cash() {
        let bars = series(&[10.0, 11.0, 12.0], &[Signal::Hold; 3]);
        let run = run_backtest(&bars, &BacktestConfig::default()).unwrap();
        assert_eq!(run.equity_curve(), vec![10_000.0; 3]);
        assert!(run.trades.is_empty());
    }

    #[test]
    fn open_position_at_end_is_marked_not_closed() {
        let bars = series(&[100.0, 125.0], &[Signal::Enter, Signal::Hold]);
        let run = run_backtest(&bars, &zero_fee()).unwrap();

        assert_eq!(run.trades.len(), 1);
        assert_eq!(run.trades[0].action, TradeAction::Buy);
        let pos = run.open_position.as_ref().expect("position stays open");
        assert_relative_eq!(pos.shares, 100.0);
        assert_relative_eq!(run.final_equity(), 12_500.0);
        assert_relative_eq!(run.final_cash, 0.0);
    }

    #[test]
    fn fees_reduce_equity_on_both_sides() {
        let bars = series(&[100.0, 100.0], &[Signal::Enter, Signal::Exit]);
        let config = BacktestConfig {
            fee: 0.01,
            ..BacktestConfig::default()
        };
        let run = run_backtest(&bars, &config).unwrap();
        assert_relative_eq!(run.equity_curve()[0], 9_900.0, epsilon = 1e-9);
        assert_relative_eq!(run.final_cash, 9_801.0, epsilon = 1e-9);
    }

    #[test]
    fn whole_share_sizing_keeps_cash_in_equity() {
        let bars = series(&[300.0, 330.0, 330.0], &[Signal::Enter, Signal::Hold, Signal::Exit]);
        let config = BacktestConfig {
            initial_cash: 1_000.0,
            fee: 0.0,
            sizing: Sizing::WholeShares,
            validate_timestamps: true,
        };
        let run = run_backtest(&bars, &config).unwrap();
        assert_eq!(run.equity_curve(), vec![1_000.0, 1_090.0, 1_090.0]);
        assert_relative_eq!(run.final_cash, 1_090.0);
    }

    #[test]
    fn whole_share_sizing_skips_unaffordable_entry() {
        let bars = series(&[500.0, 400.0], &[Signal::Enter, Signal::Enter]);
        let config = BacktestConfig {
            initial_cash: 450.0,
            fee: 0.0,
            sizing: Sizing::WholeShares,
            validate_timestamps: true,
        };
        let run = run_backtest(&bars, &config).unwrap();
        assert_eq!(run.trades, vec![Trade::buy(ts(1), 400.0, 1.0)]);
        assert_eq!(run.equity_curve(), vec![450.0, 450.0]);
    }

    #[test]
    fn empty_series_is_invalid_input() {
        let err = run_backtest(&[], &BacktestConfig::default()).unwrap_err();
        assert!(matches!(err, TradesimError::InvalidInput { .. }));
    }

    #[test]
    fn unordered_series_is_invalid_input() {
        let mut bars = series(&[1.0, 2.0], &[Signal::Hold, Signal::Hold]);
        bars.swap(0, 1);
        assert!(run_backtest(&bars, &BacktestConfig::default()).is_err());

        let lenient = BacktestConfig {
            validate_timestamps: false,
            ..BacktestConfig::default()
        };
        assert!(run_backtest(&bars, &lenient).is_ok());
    }

    #[test]
    fn augmented_series_preserves_input_rows() {
        let bars = series(&[5.0, 6.0], &[Signal::Enter, Signal::Exit]);
        let run = run_backtest(&bars, &zero_fee()).unwrap();
        assert_eq!(run.bars.len(), bars.len());
        for (eq, bar) in run.bars.iter().zip(&bars) {
            assert_eq!(&eq.bar, bar);
        }
    }
}
