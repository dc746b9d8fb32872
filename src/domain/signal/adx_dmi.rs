//! ADX/DMI trend direction.
//!
//! Neutral while ADX is below `adx_threshold`. Above it, the side follows the
//! larger DI and strength is `(|+DI - -DI| / 100) * (ADX / threshold)`.

use crate::domain::error::TradesimError;
use crate::domain::indicator::calculate_adx;
use crate::domain::series::{IndicatorKey, MarketSeries, SeriesWindow};
use crate::domain::signal::registry::{read_non_negative, read_period};
use crate::domain::signal::{clamp01, SignalDecision, SignalId};
use crate::ports::config_port::ConfigPort;

pub const NAME: &str = "adx_dmi";

const ADX: &str = "adx";
const DI_PLUS: &str = "di_plus";
const DI_MINUS: &str = "di_minus";

#[derive(Debug, Clone, PartialEq)]
pub struct AdxDmi {
    pub length: usize,
    pub adx_threshold: f64,
}

impl Default for AdxDmi {
    fn default() -> Self {
        Self {
            length: 14,
            adx_threshold: 25.0,
        }
    }
}

impl AdxDmi {
    pub fn new(length: usize, adx_threshold: f64) -> Self {
        Self {
            length,
            adx_threshold,
        }
    }

    pub fn from_config(config: &dyn ConfigPort, section: &str) -> Result<Self, TradesimError> {
        let d = Self::default();
        Ok(Self {
            length: read_period(config, section, "length", d.length)?,
            adx_threshold: read_non_negative(config, section, "adx_thresh", d.adx_threshold)?,
        })
    }

    pub fn compute_indicators(
        &self,
        id: SignalId,
        series: &mut MarketSeries,
    ) -> Result<(), TradesimError> {
        let cols = calculate_adx(series.bars(), self.length);
        series.insert_column(IndicatorKey::new(id, ADX), cols.adx)?;
        series.insert_column(IndicatorKey::new(id, DI_PLUS), cols.plus_di)?;
        series.insert_column(IndicatorKey::new(id, DI_MINUS), cols.minus_di)
    }

    pub fn generate(&self, id: SignalId, window: &SeriesWindow<'_>, label: &str) -> SignalDecision {
        let adx = window.value(&IndicatorKey::new(id, ADX));
        let plus = window.value(&IndicatorKey::new(id, DI_PLUS));
        let minus = window.value(&IndicatorKey::new(id, DI_MINUS));
        let (Some(adx), Some(plus), Some(minus)) = (adx, plus, minus) else {
            return SignalDecision::neutral(label);
        };
        if adx < self.adx_threshold {
            return SignalDecision::neutral(label);
        }
        let strength = |spread: f64| {
            clamp01(clamp01(spread / 100.0) * (adx / self.adx_threshold.max(1e-9)))
        };
        if plus > minus {
            SignalDecision::long(strength(plus - minus), label)
        } else if minus > plus {
            SignalDecision::short(strength(minus - plus), label)
        } else {
            SignalDecision::neutral(label)
        }
    }
}
