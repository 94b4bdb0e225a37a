//! Price series access port trait.

use crate::domain::error::TradesimError;
use crate::domain::ohlcv::PriceBar;

pub trait DataPort {
    /// All signal-annotated bars stored for `ticker`, ordered by timestamp.
    fn load_series(&self, ticker: &str) -> Result<Vec<PriceBar>, TradesimError>;

    /// Persist `bars` for `ticker`. Returns `false` when the target already
    /// exists and was left untouched.
    fn store_series(&self, ticker: &str, bars: &[PriceBar]) -> Result<bool, TradesimError>;
}
