//! Configuration validation.
//!
//! Runs before any data is loaded so a bad config never starts a backtest.

use crate::domain::backtest::{BacktestConfig, DEFAULT_FEE, DEFAULT_INITIAL_CASH};
use crate::domain::error::TradesimError;
use crate::domain::execution::Sizing;
use crate::ports::config_port::ConfigPort;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    validate_initial_cash(config)?;
    validate_fee(config)?;
    validate_sizing(config)?;
    validate_validate_timestamps(config)?;
    Ok(())
}

/// Require either `[data] input` or `[data] ticker`.
pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    let input = config.get_string("data", "input");
    let ticker = config.get_string("data", "ticker");

    match (input, ticker) {
        (Some(i), _) if !i.trim().is_empty() => Ok(()),
        (_, Some(t)) if !t.trim().is_empty() => Ok(()),
        _ => Err(TradesimError::ConfigMissing {
            section: "data".to_string(),
            key: "input".to_string(),
        }),
    }
}

/// Build a validated [`BacktestConfig`] from `[backtest]`, applying defaults.
pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, TradesimError> {
    validate_backtest_config(config)?;

    let sizing = match config.get_string("backtest", "sizing") {
        Some(s) => s.parse::<Sizing>()?,
        None => Sizing::default(),
    };

    let built = BacktestConfig {
        initial_cash: config.get_double("backtest", "initial_cash", DEFAULT_INITIAL_CASH),
        fee: config.get_double("backtest", "fee", DEFAULT_FEE),
        sizing,
        validate_timestamps: config.get_bool("backtest", "validate_timestamps", true),
    };
    built.validate()?;
    Ok(built)
}

fn validate_initial_cash(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    if let Some(raw) = config.get_string("backtest", "initial_cash") {
        let value: f64 = raw.trim().parse().map_err(|_| {
            TradesimError::invalid_config("initial_cash", format!("'{raw}' is not a number"))
        })?;
        if value <= 0.0 {
            return Err(TradesimError::invalid_config(
                "initial_cash",
                "initial_cash must be positive",
            ));
        }
    }
    Ok(())
}

fn validate_fee(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    if let Some(raw) = config.get_string("backtest", "fee") {
        let value: f64 = raw
            .trim()
            .parse()
            .map_err(|_| TradesimError::invalid_config("fee", format!("'{raw}' is not a number")))?;
        if !(0.0..1.0).contains(&value) {
            return Err(TradesimError::invalid_config(
                "fee",
                "fee must be between 0 (inclusive) and 1 (exclusive)",
            ));
        }
    }
    Ok(())
}

fn validate_sizing(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    if let Some(raw) = config.get_string("backtest", "sizing") {
        raw.parse::<Sizing>()?;
    }
    Ok(())
}

fn validate_validate_timestamps(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    if let Some(raw) = config.get_string("backtest", "validate_timestamps") {
        match raw.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" | "false" | "no" | "off" | "0" => {}
            _ => {
                return Err(TradesimError::invalid_config(
                    "validate_timestamps",
                    format!("'{raw}' is not a boolean"),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn adapter(ini: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(ini).unwrap()
    }

    #[test]
    fn empty_backtest_section_uses_defaults() {
        let config = build_backtest_config(&adapter("[backtest]\n")).unwrap();
        assert_eq!(config, BacktestConfig::default());
    }

    #[test]
    fn reads_all_fields() {
        let config = build_backtest_config(&adapter(
            "[backtest]\ninitial_cash = 2500\nfee = 0.002\nsizing = whole\nvalidate_timestamps = no\n",
        ))
        .unwrap();
        assert_eq!(config.initial_cash, 2500.0);
        assert_eq!(config.fee, 0.002);
        assert_eq!(config.sizing, Sizing::WholeShares);
        assert!(!config.validate_timestamps);
    }

    #[test]
    fn rejects_non_positive_cash() {
        let err = validate_backtest_config(&adapter("[backtest]\ninitial_cash = 0\n")).unwrap_err();
        assert!(matches!(err, TradesimError::InvalidConfiguration { ref field, .. } if field == "initial_cash"));
    }

    #[test]
    fn rejects_non_numeric_cash() {
        assert!(validate_backtest_config(&adapter("[backtest]\ninitial_cash = lots\n")).is_err());
    }

    #[test]
    fn rejects_fee_of_one() {
        let err = validate_backtest_config(&adapter("[backtest]\nfee = 1.0\n")).unwrap_err();
        assert!(matches!(err, TradesimError::InvalidConfiguration { ref field, .. } if field == "fee"));
    }

    #[test]
    fn rejects_negative_fee() {
        assert!(validate_backtest_config(&adapter("[backtest]\nfee = -0.1\n")).is_err());
    }

    #[test]
    fn rejects_unknown_sizing() {
        assert!(validate_backtest_config(&adapter("[backtest]\nsizing = leveraged\n")).is_err());
    }

    #[test]
    fn rejects_non_boolean_validate_timestamps() {
        let err = build_backtest_config(&adapter("[backtest]\nvalidate_timestamps = disabled\n"))
            .unwrap_err();
        assert!(matches!(
            err,
            TradesimError::InvalidConfiguration { ref field, .. } if field == "validate_timestamps"
        ));
    }

    #[test]
    fn accepts_boolean_spellings_for_validate_timestamps() {
        for value in ["true", "False", "off", "1"] {
            let ini = format!("[backtest]\nvalidate_timestamps = {value}\n");
            assert!(validate_backtest_config(&adapter(&ini)).is_ok(), "{value}");
        }
    }

    #[test]
    fn data_requires_input_or_ticker() {
        assert!(validate_data_config(&adapter("[data]\ninput = bars.csv\n")).is_ok());
        assert!(validate_data_config(&adapter("[data]\nticker = SPY\n")).is_ok());
        assert!(matches!(
            validate_data_config(&adapter("[data]\ninput =  \n")),
            Err(TradesimError::ConfigMissing { .. })
        ));
    }
}
