//! RSI mean reversion.
//!
//! Long when RSI crosses back above the lower band, short when it crosses
//! back below the upper band. Strength grows with how far the previous
//! reading sat outside the band. An optional EMA smooths the RSI first.

use crate::domain::error::TradesimError;
use crate::domain::indicator::{calculate_ema, calculate_rsi};
use crate::domain::series::{IndicatorKey, MarketSeries, SeriesWindow};
use crate::domain::signal::registry::read_period;
use crate::domain::signal::{clamp01, cross_down, cross_up, SignalDecision, SignalId};
use crate::ports::config_port::ConfigPort;

pub const NAME: &str = "rsi_reversion";

const RSI: &str = "rsi";

#[derive(Debug, Clone, PartialEq)]
pub struct RsiReversion {
    pub length: usize,
    pub upper_band: f64,
    pub lower_band: f64,
    pub smoothing: Option<usize>,
}

impl Default for RsiReversion {
    fn default() -> Self {
        Self {
            length: 14,
            upper_band: 70.0,
            lower_band: 30.0,
            smoothing: None,
        }
    }
}

impl RsiReversion {
    pub fn new(length: usize, lower_band: f64, upper_band: f64) -> Self {
        Self {
            length,
            upper_band,
            lower_band,
            smoothing: None,
        }
    }

    pub fn from_config(config: &dyn ConfigPort, section: &str) -> Result<Self, TradesimError> {
        let d = Self::default();
        let upper_band = config.get_double(section, "upper_band", d.upper_band);
        let lower_band = config.get_double(section, "lower_band", d.lower_band);
        if !(0.0 < lower_band && lower_band < upper_band && upper_band < 100.0) {
            return Err(TradesimError::invalid(
                section,
                "lower_band",
                "bands must satisfy 0 < lower_band < upper_band < 100",
            ));
        }
        let smoothing = match config.get_int(section, "band_smooth", 0) {
            0 => None,
            n if n > 0 => Some(n as usize),
            _ => {
                return Err(TradesimError::invalid(
                    section,
                    "band_smooth",
                    "band_smooth must be non-negative",
                ));
            }
        };
        Ok(Self {
            length: read_period(config, section, "length", d.length)?,
            upper_band,
            lower_band,
            smoothing,
        })
    }

    pub fn compute_indicators(
        &self,
        id: SignalId,
        series: &mut MarketSeries,
    ) -> Result<(), TradesimError> {
        let rsi = calculate_rsi(&series.closes(), self.length);
        let rsi = match self.smoothing {
            Some(n) => calculate_ema(&rsi, n),
            None => rsi,
        };
        series.insert_column(IndicatorKey::new(id, RSI), rsi)
    }

    pub fn generate(&self, id: SignalId, window: &SeriesWindow<'_>, label: &str) -> SignalDecision {
        let key = IndicatorKey::new(id, RSI);
        let (Some(r), Some(prev)) = (window.value(&key), window.value_back(&key, 1)) else {
            return SignalDecision::neutral(label);
        };
        if cross_up(prev, r, self.lower_band) {
            let depth = (self.lower_band - prev) / self.lower_band.max(1e-9);
            SignalDecision::long(clamp01(depth), label)
        } else if cross_down(prev, r, self.upper_band) {
            let depth = (prev - self.upper_band) / (100.0 - self.upper_band).max(1e-9);
            SignalDecision::short(clamp01(depth), label)
        } else {
            SignalDecision::neutral(label)
        }
    }
}
