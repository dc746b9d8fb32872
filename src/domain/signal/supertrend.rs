//! Supertrend direction flip.
//!
//! Fires only on the bar where the Supertrend direction changes. Strength
//! is the distance between the close and the new trend line in ATR units.

use crate::domain::error::TradesimError;
use crate::domain::indicator::calculate_supertrend;
use crate::domain::indicator_helpers::calc_atr;
use crate::domain::series::{IndicatorKey, MarketSeries, SeriesWindow};
use crate::domain::signal::registry::{read_period, read_positive};
use crate::domain::signal::{norm_by_atr, SignalDecision, SignalId};
use crate::ports::config_port::ConfigPort;

pub const NAME: &str = "supertrend";

const LINE: &str = "st_line";
const DIRECTION: &str = "st_dir";
const ATR: &str = "atr";

#[derive(Debug, Clone, PartialEq)]
pub struct SupertrendFlip {
    pub atr_length: usize,
    pub atr_mult: f64,
}

impl Default for SupertrendFlip {
    fn default() -> Self {
        Self {
            atr_length: 10,
            atr_mult: 3.0,
        }
    }
}

impl SupertrendFlip {
    pub fn new(atr_length: usize, atr_mult: f64) -> Self {
        Self {
            atr_length,
            atr_mult,
        }
    }

    pub fn from_config(config: &dyn ConfigPort, section: &str) -> Result<Self, TradesimError> {
        let d = Self::default();
        Ok(Self {
            atr_length: read_period(config, section, "atr_length", d.atr_length)?,
            atr_mult: read_positive(config, section, "atr_mult", d.atr_mult)?,
        })
    }

    pub fn compute_indicators(
        &self,
        id: SignalId,
        series: &mut MarketSeries,
    ) -> Result<(), TradesimError> {
        let st = calculate_supertrend(series.bars(), self.atr_length, self.atr_mult);
        let atr = calc_atr(series.bars(), self.atr_length);
        series.insert_column(IndicatorKey::new(id, LINE), st.line)?;
        series.insert_column(IndicatorKey::new(id, DIRECTION), st.direction)?;
        series.insert_column(IndicatorKey::new(id, ATR), atr)
    }

    pub fn generate(&self, id: SignalId, window: &SeriesWindow<'_>, label: &str) -> SignalDecision {
        let dir_key = IndicatorKey::new(id, DIRECTION);
        let (Some(dir), Some(prev_dir), Some(line)) = (
            window.value(&dir_key),
            window.value_back(&dir_key, 1),
            window.value(&IndicatorKey::new(id, LINE)),
        ) else {
            return SignalDecision::neutral(label);
        };
        let close = window.current().close;
        let atr = window.value(&IndicatorKey::new(id, ATR));

        if prev_dir < 0.0 && dir > 0.0 {
            SignalDecision::long(norm_by_atr(close - line, atr), label)
        } else if prev_dir > 0.0 && dir < 0.0 {
            SignalDecision::short(norm_by_atr(line - close, atr), label)
        } else {
            SignalDecision::neutral(label)
        }
    }
}
