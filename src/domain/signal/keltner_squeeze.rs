//! Keltner squeeze release.
//!
//! The squeeze metric is Bollinger width over Keltner width; a value below
//! `squeeze_thresh` means the Bollinger bands sit inside the Keltner
//! channel. After at least `min_squeeze_bars` consecutive squeezed bars, a
//! close outside the Keltner channel fires in the breakout direction.
//! Strength is the breakout distance in channel widths, boosted by how
//! tight the squeeze still is.

use crate::domain::error::TradesimError;
use crate::domain::indicator::{calculate_bollinger, calculate_keltner};
use crate::domain::series::{IndicatorKey, MarketSeries, SeriesWindow};
use crate::domain::signal::registry::{read_period, read_positive};
use crate::domain::signal::{clamp01, SignalDecision, SignalId};
use crate::ports::config_port::ConfigPort;

pub const NAME: &str = "keltner_squeeze";

const KC_UPPER: &str = "kc_upper";
const KC_LOWER: &str = "kc_lower";
const SQUEEZE: &str = "squeeze_metric";
const SQUEEZE_COUNT: &str = "squeeze_count";

#[derive(Debug, Clone, PartialEq)]
pub struct KeltnerSqueeze {
    pub ema_len: usize,
    pub atr_len: usize,
    pub atr_mult: f64,
    pub squeeze_bb_len: usize,
    pub squeeze_bb_std: f64,
    pub squeeze_thresh: f64,
    pub min_squeeze_bars: usize,
}

impl Default for KeltnerSqueeze {
    fn default() -> Self {
        Self {
            ema_len: 20,
            atr_len: 14,
            atr_mult: 1.5,
            squeeze_bb_len: 20,
            squeeze_bb_std: 2.0,
            squeeze_thresh: 1.0,
            min_squeeze_bars: 5,
        }
    }
}

impl KeltnerSqueeze {
    pub fn from_config(config: &dyn ConfigPort, section: &str) -> Result<Self, TradesimError> {
        let d = Self::default();
        Ok(Self {
            ema_len: read_period(config, section, "ema_len", d.ema_len)?,
            atr_len: read_period(config, section, "atr_len", d.atr_len)?,
            atr_mult: read_positive(config, section, "atr_mult", d.atr_mult)?,
            squeeze_bb_len: read_period(config, section, "squeeze_bb_len", d.squeeze_bb_len)?,
            squeeze_bb_std: read_positive(config, section, "squeeze_bb_std", d.squeeze_bb_std)?,
            squeeze_thresh: read_positive(config, section, "squeeze_thresh", d.squeeze_thresh)?,
            min_squeeze_bars: read_period(config, section, "min_squeeze_bars", d.min_squeeze_bars)?,
        })
    }

    fn warmup(&self) -> usize {
        self.ema_len.max(self.squeeze_bb_len).max(self.min_squeeze_bars)
    }

    pub fn compute_indicators(
        &self,
        id: SignalId,
        series: &mut MarketSeries,
    ) -> Result<(), TradesimError> {
        let kc = calculate_keltner(series.bars(), self.ema_len, self.atr_len, self.atr_mult);
        let bb = calculate_bollinger(&series.closes(), self.squeeze_bb_len, self.squeeze_bb_std);

        let metric: Vec<f64> = (0..series.len())
            .map(|i| {
                let kc_width = kc.upper[i] - kc.lower[i];
                if kc_width == 0.0 {
                    f64::NAN
                } else {
                    (bb.upper[i] - bb.lower[i]) / kc_width
                }
            })
            .collect();

        let n = self.min_squeeze_bars;
        let mut count = vec![f64::NAN; metric.len()];
        for i in n.saturating_sub(1)..metric.len() {
            let squeezed = metric[i + 1 - n..=i]
                .iter()
                .filter(|m| **m < self.squeeze_thresh)
                .count();
            count[i] = squeezed as f64;
        }

        series.insert_column(IndicatorKey::new(id, KC_UPPER), kc.upper)?;
        series.insert_column(IndicatorKey::new(id, KC_LOWER), kc.lower)?;
        series.insert_column(IndicatorKey::new(id, SQUEEZE), metric)?;
        series.insert_column(IndicatorKey::new(id, SQUEEZE_COUNT), count)
    }

    pub fn generate(&self, id: SignalId, window: &SeriesWindow<'_>, label: &str) -> SignalDecision {
        if window.index() < self.warmup() {
            return SignalDecision::neutral(label);
        }
        let upper = window.value(&IndicatorKey::new(id, KC_UPPER));
        let lower = window.value(&IndicatorKey::new(id, KC_LOWER));
        let metric = window.value(&IndicatorKey::new(id, SQUEEZE));
        let count = window.value(&IndicatorKey::new(id, SQUEEZE_COUNT));
        let (Some(ku), Some(kl), Some(sm), Some(count)) = (upper, lower, metric, count) else {
            return SignalDecision::neutral(label);
        };
        let width = ku - kl;
        if count < self.min_squeeze_bars as f64 || width <= 0.0 {
            return SignalDecision::neutral(label);
        }

        let close = window.current().close;
        let squeeze_factor = clamp01(1.5 - clamp01(sm));
        let boost = 0.5 + 0.5 * squeeze_factor;
        if close > ku {
            SignalDecision::long(clamp01((close - ku) / width * boost), label)
        } else if close < kl {
            SignalDecision::short(clamp01((kl - close) / width * boost), label)
        } else {
            SignalDecision::neutral(label)
        }
    }
}
