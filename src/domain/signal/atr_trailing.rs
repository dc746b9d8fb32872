//! ATR trailing-stop reversal (chandelier trails).
//!
//! `trail_long = highest_high(n) - mult * ATR(n)` and
//! `trail_short = lowest_low(n) + mult * ATR(n)`. A close crossing above the
//! short trail is a long reversal, a close crossing below the long trail a
//! short one. Strength is the crossing distance in ATR units.

use crate::domain::error::TradesimError;
use crate::domain::indicator_helpers::{calc_atr, rolling_max, rolling_min};
use crate::domain::series::{IndicatorKey, MarketSeries, SeriesWindow};
use crate::domain::signal::registry::{read_period, read_positive};
use crate::domain::signal::{norm_by_atr, SignalDecision, SignalId};
use crate::ports::config_port::ConfigPort;

pub const NAME: &str = "atr_trailing";

const ATR: &str = "atr";
const TRAIL_LONG: &str = "trail_long";
const TRAIL_SHORT: &str = "trail_short";

#[derive(Debug, Clone, PartialEq)]
pub struct AtrTrailing {
    pub atr_len: usize,
    pub atr_mult: f64,
}

impl Default for AtrTrailing {
    fn default() -> Self {
        Self {
            atr_len: 14,
            atr_mult: 3.0,
        }
    }
}

impl AtrTrailing {
    pub fn new(atr_len: usize, atr_mult: f64) -> Self {
        Self { atr_len, atr_mult }
    }

    pub fn from_config(config: &dyn ConfigPort, section: &str) -> Result<Self, TradesimError> {
        let d = Self::default();
        Ok(Self {
            atr_len: read_period(config, section, "atr_len", d.atr_len)?,
            atr_mult: read_positive(config, section, "atr_mult", d.atr_mult)?,
        })
    }

    pub fn compute_indicators(
        &self,
        id: SignalId,
        series: &mut MarketSeries,
    ) -> Result<(), TradesimError> {
        let atr = calc_atr(series.bars(), self.atr_len);
        let highest = rolling_max(&series.highs(), self.atr_len);
        let lowest = rolling_min(&series.lows(), self.atr_len);
        let trail_long = highest
            .iter()
            .zip(&atr)
            .map(|(h, a)| h - self.atr_mult * a)
            .collect();
        let trail_short = lowest
            .iter()
            .zip(&atr)
            .map(|(l, a)| l + self.atr_mult * a)
            .collect();
        series.insert_column(IndicatorKey::new(id, TRAIL_LONG), trail_long)?;
        series.insert_column(IndicatorKey::new(id, TRAIL_SHORT), trail_short)?;
        series.insert_column(IndicatorKey::new(id, ATR), atr)
    }

    pub fn generate(&self, id: SignalId, window: &SeriesWindow<'_>, label: &str) -> SignalDecision {
        let trail_long = window.value(&IndicatorKey::new(id, TRAIL_LONG));
        let trail_short = window.value(&IndicatorKey::new(id, TRAIL_SHORT));
        let (Some(tl), Some(ts), Some(prev)) = (trail_long, trail_short, window.bar_back(1)) else {
            return SignalDecision::neutral(label);
        };
        let close = window.current().close;
        let atr = window.value(&IndicatorKey::new(id, ATR));

        if prev.close <= ts && close > ts {
            SignalDecision::long(norm_by_atr(close - ts, atr), label)
        } else if prev.close >= tl && close < tl {
            SignalDecision::short(norm_by_atr(tl - close, atr), label)
        } else {
            SignalDecision::neutral(label)
        }
    }
}
