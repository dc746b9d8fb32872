//! Donchian breakout with pullback confirmation.
//!
//! Compares the current close against the previous bar's channel. An upside
//! breakout only counts if price dipped during the pullback window (the
//! lowest low of that window is below the close `pullback_len` bars ago),
//! and symmetrically for the downside. Strength is the breakout distance in
//! ATR units.

use crate::domain::error::TradesimError;
use crate::domain::indicator_helpers::{calc_atr, rolling_max, rolling_min};
use crate::domain::series::{IndicatorKey, MarketSeries, SeriesWindow};
use crate::domain::signal::registry::read_period;
use crate::domain::signal::{norm_by_atr, SignalDecision, SignalId};
use crate::ports::config_port::ConfigPort;

pub const NAME: &str = "donchian_breakout";

const HIGH: &str = "donch_high";
const LOW: &str = "donch_low";
const PULL_HIGH: &str = "pull_high";
const PULL_LOW: &str = "pull_low";
const ATR: &str = "atr";

#[derive(Debug, Clone, PartialEq)]
pub struct DonchianBreakout {
    pub breakout_len: usize,
    pub pullback_len: usize,
    pub confirm_close: bool,
}

impl Default for DonchianBreakout {
    fn default() -> Self {
        Self {
            breakout_len: 20,
            pullback_len: 5,
            confirm_close: true,
        }
    }
}

impl DonchianBreakout {
    pub fn new(breakout_len: usize, pullback_len: usize) -> Self {
        Self {
            breakout_len,
            pullback_len,
            confirm_close: true,
        }
    }

    pub fn from_config(config: &dyn ConfigPort, section: &str) -> Result<Self, TradesimError> {
        let d = Self::default();
        Ok(Self {
            breakout_len: read_period(config, section, "breakout_len", d.breakout_len)?,
            pullback_len: read_period(config, section, "pullback_len", d.pullback_len)?,
            confirm_close: config.get_bool(section, "confirm_close", d.confirm_close),
        })
    }

    fn atr_len(&self) -> usize {
        (self.breakout_len / 2).max(14)
    }

    pub fn compute_indicators(
        &self,
        id: SignalId,
        series: &mut MarketSeries,
    ) -> Result<(), TradesimError> {
        let highs = series.highs();
        let lows = series.lows();
        let atr = calc_atr(series.bars(), self.atr_len());
        series.insert_column(IndicatorKey::new(id, HIGH), rolling_max(&highs, self.breakout_len))?;
        series.insert_column(IndicatorKey::new(id, LOW), rolling_min(&lows, self.breakout_len))?;
        series.insert_column(
            IndicatorKey::new(id, PULL_HIGH),
            rolling_max(&highs, self.pullback_len),
        )?;
        series.insert_column(
            IndicatorKey::new(id, PULL_LOW),
            rolling_min(&lows, self.pullback_len),
        )?;
        series.insert_column(IndicatorKey::new(id, ATR), atr)
    }

    pub fn generate(&self, id: SignalId, window: &SeriesWindow<'_>, label: &str) -> SignalDecision {
        if window.index() < self.breakout_len.max(self.pullback_len) {
            return SignalDecision::neutral(label);
        }
        let prior = |column| window.value_back(&IndicatorKey::new(id, column), 1);
        let (Some(dh), Some(dl), Some(recent_high), Some(recent_low)) =
            (prior(HIGH), prior(LOW), prior(PULL_HIGH), prior(PULL_LOW))
        else {
            return SignalDecision::neutral(label);
        };
        let Some(anchor) = window.bar_back(self.pullback_len) else {
            return SignalDecision::neutral(label);
        };

        let bar = window.current();
        let atr = window.value(&IndicatorKey::new(id, ATR));
        let (up_price, down_price) = if self.confirm_close {
            (bar.close, bar.close)
        } else {
            (bar.high, bar.low)
        };

        if up_price > dh && recent_low < anchor.close {
            SignalDecision::long(norm_by_atr(bar.close - dh, atr), label)
        } else if down_price < dl && recent_high > anchor.close {
            SignalDecision::short(norm_by_atr(dl - bar.close, atr), label)
        } else {
            SignalDecision::neutral(label)
        }
    }
}
