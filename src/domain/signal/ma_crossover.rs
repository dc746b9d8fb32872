//! Moving average crossover.
//!
//! Long when `short_ma - long_ma` crosses above `+threshold`, short when it
//! crosses below `-threshold`, where `threshold = tick_size * delta_tick_factor`.
//! Strength is always 1 on a cross.

use crate::domain::error::TradesimError;
use crate::domain::indicator::MaKind;
use crate::domain::series::{IndicatorKey, MarketSeries, SeriesWindow};
use crate::domain::signal::registry::{read_ma_kind, read_non_negative, read_period};
use crate::domain::signal::{SignalDecision, SignalId};
use crate::ports::config_port::ConfigPort;

pub const NAME: &str = "ma_crossover";

const DELTA: &str = "ma_delta";

#[derive(Debug, Clone, PartialEq)]
pub struct MaCrossover {
    pub short_ma: MaKind,
    pub long_ma: MaKind,
    pub short_period: usize,
    pub long_period: usize,
    pub tick_size: f64,
    pub delta_tick_factor: f64,
}

impl Default for MaCrossover {
    fn default() -> Self {
        Self {
            short_ma: MaKind::Ema,
            long_ma: MaKind::Sma,
            short_period: 9,
            long_period: 12,
            tick_size: 0.0,
            delta_tick_factor: 1.0,
        }
    }
}

impl MaCrossover {
    pub fn new(short_ma: MaKind, short_period: usize, long_ma: MaKind, long_period: usize) -> Self {
        Self {
            short_ma,
            long_ma,
            short_period,
            long_period,
            ..Self::default()
        }
    }

    pub fn with_threshold(mut self, tick_size: f64, delta_tick_factor: f64) -> Self {
        self.tick_size = tick_size;
        self.delta_tick_factor = delta_tick_factor;
        self
    }

    pub fn from_config(config: &dyn ConfigPort, section: &str) -> Result<Self, TradesimError> {
        let d = Self::default();
        Ok(Self {
            short_ma: read_ma_kind(config, section, "short_ma", d.short_ma)?,
            long_ma: read_ma_kind(config, section, "long_ma", d.long_ma)?,
            short_period: read_period(config, section, "short_period", d.short_period)?,
            long_period: read_period(config, section, "long_period", d.long_period)?,
            tick_size: read_non_negative(config, section, "tick_size", d.tick_size)?,
            delta_tick_factor: read_non_negative(
                config,
                section,
                "delta_tick_factor",
                d.delta_tick_factor,
            )?,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.tick_size * self.delta_tick_factor
    }

    pub fn compute_indicators(
        &self,
        id: SignalId,
        series: &mut MarketSeries,
    ) -> Result<(), TradesimError> {
        let closes = series.closes();
        let short = self.short_ma.compute(&closes, self.short_period);
        let long = self.long_ma.compute(&closes, self.long_period);
        let delta = short.iter().zip(&long).map(|(s, l)| s - l).collect();
        series.insert_column(IndicatorKey::new(id, DELTA), delta)
    }

    pub fn generate(&self, id: SignalId, window: &SeriesWindow<'_>, label: &str) -> SignalDecision {
        let key = IndicatorKey::new(id, DELTA);
        let (Some(delta), Some(prior)) = (window.value(&key), window.value_back(&key, 1)) else {
            return SignalDecision::neutral(label);
        };
        let thresh = self.threshold();
        if prior <= thresh && delta > thresh {
            SignalDecision::long(1.0, label)
        } else if prior >= -thresh && delta < -thresh {
            SignalDecision::short(1.0, label)
        } else {
            SignalDecision::neutral(label)
        }
    }
}
