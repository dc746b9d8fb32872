//! Bollinger band breach.
//!
//! Long when the close is below the lower band, short when above the upper
//! band. Strength is the distance outside the band over the band width.

use crate::domain::error::TradesimError;
use crate::domain::indicator::bollinger::{DEFAULT_MULTIPLIER, DEFAULT_PERIOD};
use crate::domain::indicator::calculate_bollinger;
use crate::domain::series::{IndicatorKey, MarketSeries, SeriesWindow};
use crate::domain::signal::registry::{read_period, read_positive};
use crate::domain::signal::{SignalDecision, SignalId};
use crate::ports::config_port::ConfigPort;

pub const NAME: &str = "bollinger";

const UPPER: &str = "bb_upper";
const LOWER: &str = "bb_lower";

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBreach {
    pub length: usize,
    pub std_multiplier: f64,
}

impl Default for BollingerBreach {
    fn default() -> Self {
        Self {
            length: DEFAULT_PERIOD,
            std_multiplier: DEFAULT_MULTIPLIER,
        }
    }
}

impl BollingerBreach {
    pub fn new(length: usize, std_multiplier: f64) -> Self {
        Self {
            length,
            std_multiplier,
        }
    }

    pub fn from_config(config: &dyn ConfigPort, section: &str) -> Result<Self, TradesimError> {
        let d = Self::default();
        Ok(Self {
            length: read_period(config, section, "length", d.length)?,
            std_multiplier: read_positive(config, section, "std", d.std_multiplier)?,
        })
    }

    pub fn compute_indicators(
        &self,
        id: SignalId,
        series: &mut MarketSeries,
    ) -> Result<(), TradesimError> {
        let bands = calculate_bollinger(&series.closes(), self.length, self.std_multiplier);
        series.insert_column(IndicatorKey::new(id, UPPER), bands.upper)?;
        series.insert_column(IndicatorKey::new(id, LOWER), bands.lower)
    }

    pub fn generate(&self, id: SignalId, window: &SeriesWindow<'_>, label: &str) -> SignalDecision {
        let upper = window.value(&IndicatorKey::new(id, UPPER));
        let lower = window.value(&IndicatorKey::new(id, LOWER));
        let (Some(upper), Some(lower)) = (upper, lower) else {
            return SignalDecision::neutral(label);
        };
        let close = window.current().close;
        let width = upper - lower;
        let scaled = |distance: f64| if width > 0.0 { distance / width } else { 1.0 };

        if close < lower {
            SignalDecision::long(scaled(lower - close), label)
        } else if close > upper {
            SignalDecision::short(scaled(close - upper), label)
        } else {
            SignalDecision::neutral(label)
        }
    }
}
