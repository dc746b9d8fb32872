//! MACD momentum state.
//!
//! Long while the MACD line is above its signal line (and above zero when
//! `zero_line_bias` is set), short in the mirrored case. Strength is the
//! histogram magnitude over its rolling sample standard deviation.

use crate::domain::error::TradesimError;
use crate::domain::indicator::macd::{DEFAULT_FAST, DEFAULT_SIGNAL, DEFAULT_SLOW};
use crate::domain::indicator::{calculate_macd, calculate_sample_stddev};
use crate::domain::series::{IndicatorKey, MarketSeries, SeriesWindow};
use crate::domain::signal::registry::read_period;
use crate::domain::signal::{clamp01, SignalDecision, SignalId};
use crate::ports::config_port::ConfigPort;

pub const NAME: &str = "macd_momentum";

const LINE: &str = "macd";
const SIGNAL: &str = "macd_signal";
const HIST: &str = "macd_hist";
const HIST_STD: &str = "macd_hist_std";

#[derive(Debug, Clone, PartialEq)]
pub struct MacdMomentum {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
    pub zero_line_bias: bool,
    pub std_len: usize,
}

impl Default for MacdMomentum {
    fn default() -> Self {
        Self {
            fast: DEFAULT_FAST,
            slow: DEFAULT_SLOW,
            signal: DEFAULT_SIGNAL,
            zero_line_bias: true,
            std_len: 50,
        }
    }
}

impl MacdMomentum {
    pub fn from_config(config: &dyn ConfigPort, section: &str) -> Result<Self, TradesimError> {
        let d = Self::default();
        let fast = read_period(config, section, "fast", d.fast)?;
        let slow = read_period(config, section, "slow", d.slow)?;
        if fast >= slow {
            return Err(TradesimError::invalid(section, "fast", "fast must be shorter than slow"));
        }
        let std_len = read_period(config, section, "std_len", d.std_len)?;
        if std_len < 2 {
            return Err(TradesimError::invalid(section, "std_len", "std_len must be at least 2"));
        }
        Ok(Self {
            fast,
            slow,
            signal: read_period(config, section, "signal", d.signal)?,
            zero_line_bias: config.get_bool(section, "zero_line_bias", d.zero_line_bias),
            std_len,
        })
    }

    pub fn compute_indicators(
        &self,
        id: SignalId,
        series: &mut MarketSeries,
    ) -> Result<(), TradesimError> {
        let macd = calculate_macd(&series.closes(), self.fast, self.slow, self.signal);
        let hist_std = calculate_sample_stddev(&macd.histogram, self.std_len);
        series.insert_column(IndicatorKey::new(id, LINE), macd.line)?;
        series.insert_column(IndicatorKey::new(id, SIGNAL), macd.signal)?;
        series.insert_column(IndicatorKey::new(id, HIST), macd.histogram)?;
        series.insert_column(IndicatorKey::new(id, HIST_STD), hist_std)
    }

    pub fn generate(&self, id: SignalId, window: &SeriesWindow<'_>, label: &str) -> SignalDecision {
        let line = window.value(&IndicatorKey::new(id, LINE));
        let signal = window.value(&IndicatorKey::new(id, SIGNAL));
        let hist = window.value(&IndicatorKey::new(id, HIST));
        let (Some(line), Some(signal), Some(hist)) = (line, signal, hist) else {
            return SignalDecision::neutral(label);
        };
        let strength = match window.value(&IndicatorKey::new(id, HIST_STD)) {
            Some(std) if std > 0.0 => clamp01(hist.abs() / std),
            _ => clamp01(hist.abs()),
        };

        if line > signal && (!self.zero_line_bias || line > 0.0) {
            SignalDecision::long(strength, label)
        } else if line < signal && (!self.zero_line_bias || line < 0.0) {
            SignalDecision::short(strength, label)
        } else {
            SignalDecision::neutral(label)
        }
    }
}
