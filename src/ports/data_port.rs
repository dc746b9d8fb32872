//! Market data access port.

use crate::domain::error::TradesimError;
use crate::domain::series::MarketSeries;

pub trait DataPort {
    /// Loads every bar stored for `symbol`, in stored order.
    fn load_series(&self, symbol: &str) -> Result<MarketSeries, TradesimError>;

    fn list_symbols(&self) -> Result<Vec<String>, TradesimError>;
}
