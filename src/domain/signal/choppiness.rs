//! Choppiness regime filter.
//!
//! Neutral in ranging or mixed regimes. When the market is trending
//! (`CHOP < chop_low`) and a baseline EMA is configured, emits a weak bias
//! toward the side of the close relative to that baseline.

use crate::domain::error::TradesimError;
use crate::domain::indicator::{calculate_choppiness, calculate_ema};
use crate::domain::series::{IndicatorKey, MarketSeries, SeriesWindow};
use crate::domain::signal::registry::read_period;
use crate::domain::signal::{Regime, SignalDecision, SignalId};
use crate::ports::config_port::ConfigPort;

pub const NAME: &str = "choppiness";

const CHOP: &str = "choppiness";
const BASELINE: &str = "base_ma";

#[derive(Debug, Clone, PartialEq)]
pub struct ChoppinessFilter {
    pub length: usize,
    pub chop_low: f64,
    pub chop_high: f64,
    pub baseline_ma_len: Option<usize>,
    pub bias_strength: f64,
}

impl Default for ChoppinessFilter {
    fn default() -> Self {
        Self {
            length: 14,
            chop_low: 38.0,
            chop_high: 62.0,
            baseline_ma_len: None,
            bias_strength: 0.2,
        }
    }
}

impl ChoppinessFilter {
    pub fn from_config(config: &dyn ConfigPort, section: &str) -> Result<Self, TradesimError> {
        let d = Self::default();
        let length = read_period(config, section, "length", d.length)?;
        if length < 2 {
            return Err(TradesimError::invalid(section, "length", "length must be at least 2"));
        }
        let chop_low = config.get_double(section, "chop_low", d.chop_low);
        let chop_high = config.get_double(section, "chop_high", d.chop_high);
        if !(chop_low < chop_high) {
            return Err(TradesimError::invalid(
                section,
                "chop_low",
                "chop_low must be below chop_high",
            ));
        }
        let baseline_ma_len = match config.get_int(section, "baseline_ma_len", 0) {
            n if n > 0 => Some(n as usize),
            _ => None,
        };
        let bias_strength = config.get_double(section, "bias_strength", d.bias_strength);
        if !(0.0..=1.0).contains(&bias_strength) {
            return Err(TradesimError::invalid(
                section,
                "bias_strength",
                "bias_strength must be within [0, 1]",
            ));
        }
        Ok(Self {
            length,
            chop_low,
            chop_high,
            baseline_ma_len,
            bias_strength,
        })
    }

    pub fn compute_indicators(
        &self,
        id: SignalId,
        series: &mut MarketSeries,
    ) -> Result<(), TradesimError> {
        let chop = calculate_choppiness(series.bars(), self.length);
        series.insert_column(IndicatorKey::new(id, CHOP), chop)?;
        if let Some(len) = self.baseline_ma_len {
            let base = calculate_ema(&series.closes(), len);
            series.insert_column(IndicatorKey::new(id, BASELINE), base)?;
        }
        Ok(())
    }

    /// Market regime at the window's current bar; `None` during warmup.
    pub fn regime(&self, id: SignalId, window: &SeriesWindow<'_>) -> Option<Regime> {
        let chop = window.value(&IndicatorKey::new(id, CHOP))?;
        Some(if chop < self.chop_low {
            Regime::Trend
        } else if chop > self.chop_high {
            Regime::Range
        } else {
            Regime::Mixed
        })
    }

    pub fn generate(&self, id: SignalId, window: &SeriesWindow<'_>, label: &str) -> SignalDecision {
        let Some(chop) = window.value(&IndicatorKey::new(id, CHOP)) else {
            return SignalDecision::neutral(label);
        };
        if chop >= self.chop_low {
            return SignalDecision::neutral(label);
        }
        let Some(base) = window.value(&IndicatorKey::new(id, BASELINE)) else {
            return SignalDecision::neutral(label);
        };
        let close = window.current().close;
        if close > base {
            SignalDecision::long(self.bias_strength, label)
        } else if close < base {
            SignalDecision::short(self.bias_strength, label)
        } else {
            SignalDecision::neutral(label)
        }
    }
}
