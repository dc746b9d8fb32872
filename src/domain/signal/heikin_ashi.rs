//! Heikin-Ashi trend continuation.
//!
//! Follows runs of same-colored Heikin-Ashi candles. A run of at least
//! `min_streak` candles whose body fills at least `body_ratio_thresh` of the
//! candle range fires in the run's direction. With `wick_filter` on, a
//! candle whose wick against the trend exceeds 30% of its range is ignored.

use crate::domain::error::TradesimError;
use crate::domain::indicator::calculate_heikin_ashi;
use crate::domain::series::{IndicatorKey, MarketSeries, SeriesWindow};
use crate::domain::signal::registry::{read_non_negative, read_period};
use crate::domain::signal::{clamp01, SignalDecision, SignalId};
use crate::ports::config_port::ConfigPort;

pub const NAME: &str = "heikin_ashi_trend";

const HA_OPEN: &str = "ha_open";
const HA_HIGH: &str = "ha_high";
const HA_LOW: &str = "ha_low";
const HA_CLOSE: &str = "ha_close";
/// Signed length of the current color run: `+n` for n green candles.
const STREAK: &str = "ha_streak";

const MAX_WICK_RATIO: f64 = 0.3;

#[derive(Debug, Clone, PartialEq)]
pub struct HeikinAshiTrend {
    pub min_streak: usize,
    pub body_ratio_thresh: f64,
    pub wick_filter: bool,
}

impl Default for HeikinAshiTrend {
    fn default() -> Self {
        Self {
            min_streak: 2,
            body_ratio_thresh: 0.6,
            wick_filter: true,
        }
    }
}

impl HeikinAshiTrend {
    pub fn from_config(config: &dyn ConfigPort, section: &str) -> Result<Self, TradesimError> {
        let d = Self::default();
        Ok(Self {
            min_streak: read_period(config, section, "min_streak", d.min_streak)?,
            body_ratio_thresh: read_non_negative(
                config,
                section,
                "body_ratio_thresh",
                d.body_ratio_thresh,
            )?,
            wick_filter: config.get_bool(section, "wick_filter", d.wick_filter),
        })
    }

    pub fn compute_indicators(
        &self,
        id: SignalId,
        series: &mut MarketSeries,
    ) -> Result<(), TradesimError> {
        let ha = calculate_heikin_ashi(series.bars());

        let mut streak = vec![f64::NAN; ha.close.len()];
        let mut run = 0.0_f64;
        for i in 0..ha.close.len() {
            if !(ha.open[i].is_finite() && ha.close[i].is_finite()) {
                run = 0.0;
                continue;
            }
            let color = if ha.close[i] > ha.open[i] { 1.0 } else { -1.0 };
            run = if run * color > 0.0 { run + color } else { color };
            streak[i] = run;
        }

        series.insert_column(IndicatorKey::new(id, HA_OPEN), ha.open)?;
        series.insert_column(IndicatorKey::new(id, HA_HIGH), ha.high)?;
        series.insert_column(IndicatorKey::new(id, HA_LOW), ha.low)?;
        series.insert_column(IndicatorKey::new(id, HA_CLOSE), ha.close)?;
        series.insert_column(IndicatorKey::new(id, STREAK), streak)
    }

    pub fn generate(&self, id: SignalId, window: &SeriesWindow<'_>, label: &str) -> SignalDecision {
        if window.index() < self.min_streak {
            return SignalDecision::neutral(label);
        }
        let (Some(open), Some(high), Some(low), Some(close), Some(streak)) = (
            window.value(&IndicatorKey::new(id, HA_OPEN)),
            window.value(&IndicatorKey::new(id, HA_HIGH)),
            window.value(&IndicatorKey::new(id, HA_LOW)),
            window.value(&IndicatorKey::new(id, HA_CLOSE)),
            window.value(&IndicatorKey::new(id, STREAK)),
        ) else {
            return SignalDecision::neutral(label);
        };
        let range = high - low;
        if range <= 0.0 {
            return SignalDecision::neutral(label);
        }

        let body_ratio = (close - open).abs() / range;
        let run = streak.abs();
        if run < self.min_streak as f64 || body_ratio < self.body_ratio_thresh {
            return SignalDecision::neutral(label);
        }
        let strength = clamp01(run / (self.min_streak + 2) as f64 * clamp01(body_ratio));

        if streak > 0.0 {
            let upper_wick = high - close.max(open);
            if self.wick_filter && upper_wick / range > MAX_WICK_RATIO {
                return SignalDecision::neutral(label);
            }
            SignalDecision::long(strength, label)
        } else {
            let lower_wick = close.min(open) - low;
            if self.wick_filter && lower_wick / range > MAX_WICK_RATIO {
                return SignalDecision::neutral(label);
            }
            SignalDecision::short(strength, label)
        }
    }
}
