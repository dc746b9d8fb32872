//! Volume spike exhaustion.
//!
//! Looks for a bar whose volume and true range are both well above their
//! averages and which closes at one extreme of its range against the move.
//! A selling climax (down bar closing near its low) is read as a long
//! reversal, a buying climax as a short one.

use crate::domain::error::TradesimError;
use crate::domain::indicator_helpers::{sma, true_ranges};
use crate::domain::series::{IndicatorKey, MarketSeries, SeriesWindow};
use crate::domain::signal::registry::{read_non_negative, read_period, read_positive};
use crate::domain::signal::{clamp01, SignalDecision, SignalId};
use crate::ports::config_port::ConfigPort;

pub const NAME: &str = "volume_spike_exhaustion";

const VOL_MA: &str = "vol_ma";
const TR: &str = "tr";
const TR_MA: &str = "tr_ma";

#[derive(Debug, Clone, PartialEq)]
pub struct VolumeSpikeExhaustion {
    pub vol_len: usize,
    pub vol_spike_mult: f64,
    pub range_len: usize,
    pub range_spike_mult: f64,
    /// Max distance of the close from the extreme, as a fraction of the range.
    pub proximity_ratio: f64,
}

impl Default for VolumeSpikeExhaustion {
    fn default() -> Self {
        Self {
            vol_len: 20,
            vol_spike_mult: 2.0,
            range_len: 20,
            range_spike_mult: 2.0,
            proximity_ratio: 0.2,
        }
    }
}

impl VolumeSpikeExhaustion {
    pub fn from_config(config: &dyn ConfigPort, section: &str) -> Result<Self, TradesimError> {
        let d = Self::default();
        Ok(Self {
            vol_len: read_period(config, section, "vol_len", d.vol_len)?,
            vol_spike_mult: read_positive(config, section, "vol_spike_mult", d.vol_spike_mult)?,
            range_len: read_period(config, section, "range_len", d.range_len)?,
            range_spike_mult: read_positive(config, section, "range_spike_mult", d.range_spike_mult)?,
            proximity_ratio: read_non_negative(config, section, "proximity_ratio", d.proximity_ratio)?,
        })
    }

    pub fn compute_indicators(
        &self,
        id: SignalId,
        series: &mut MarketSeries,
    ) -> Result<(), TradesimError> {
        let tr = true_ranges(series.bars());
        let tr_ma = sma(&tr, self.range_len);
        let vol_ma = sma(&series.volumes(), self.vol_len);
        series.insert_column(IndicatorKey::new(id, VOL_MA), vol_ma)?;
        series.insert_column(IndicatorKey::new(id, TR_MA), tr_ma)?;
        series.insert_column(IndicatorKey::new(id, TR), tr)
    }

    pub fn generate(&self, id: SignalId, window: &SeriesWindow<'_>, label: &str) -> SignalDecision {
        let (Some(vol_ma), Some(tr), Some(tr_ma), Some(prev)) = (
            window.value(&IndicatorKey::new(id, VOL_MA)),
            window.value(&IndicatorKey::new(id, TR)),
            window.value(&IndicatorKey::new(id, TR_MA)),
            window.bar_back(1),
        ) else {
            return SignalDecision::neutral(label);
        };
        let bar = window.current();
        if tr <= 0.0
            || !(bar.volume > self.vol_spike_mult * vol_ma)
            || !(tr > self.range_spike_mult * tr_ma)
        {
            return SignalDecision::neutral(label);
        }

        let from_low = (bar.close - bar.low) / tr;
        let from_high = (bar.high - bar.close) / tr;
        let down_bar = bar.close < bar.open || bar.close < prev.close;
        let up_bar = bar.close > bar.open || bar.close > prev.close;
        let intensity = if vol_ma > 0.0 && tr_ma > 0.0 {
            0.5 * (bar.volume / vol_ma + tr / tr_ma)
        } else {
            1.0
        };

        if from_low <= self.proximity_ratio && down_bar {
            SignalDecision::long(clamp01(intensity * clamp01(1.0 - from_low)), label)
        } else if from_high <= self.proximity_ratio && up_bar {
            SignalDecision::short(clamp01(intensity * clamp01(1.0 - from_high)), label)
        } else {
            SignalDecision::neutral(label)
        }
    }
}
