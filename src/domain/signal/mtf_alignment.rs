//! Moving-average alignment across two horizons.
//!
//! The higher-timeframe trend is approximated on the same series by a slow
//! EMA (`ht_ma_len`) and the lower-timeframe one by a fast EMA
//! (`lt_ma_len`). A close above the slow EMA is long; in `ht_and_lt` mode
//! the fast EMA must also sit above the slow one. Strength is the distance
//! from the slow EMA in ATR(14) units, capped at `cap`.

use std::fmt;
use std::str::FromStr;

use crate::domain::error::TradesimError;
use crate::domain::indicator::calculate_ema;
use crate::domain::indicator_helpers::calc_atr;
use crate::domain::series::{IndicatorKey, MarketSeries, SeriesWindow};
use crate::domain::signal::registry::{read_period, read_positive};
use crate::domain::signal::{clamp01, SignalDecision, SignalId};
use crate::ports::config_port::ConfigPort;

pub const NAME: &str = "mtf_ma_alignment";

const HT_MA: &str = "ht_ma";
const LT_MA: &str = "lt_ma";
const ATR: &str = "atr";
const ATR_LEN: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentMode {
    HtOnly,
    HtAndLt,
}

impl FromStr for AlignmentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ht_only" => Ok(AlignmentMode::HtOnly),
            "ht_and_lt" => Ok(AlignmentMode::HtAndLt),
            other => Err(format!(
                "unknown alignment mode '{other}' (expected ht_only or ht_and_lt)"
            )),
        }
    }
}

impl fmt::Display for AlignmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignmentMode::HtOnly => write!(f, "ht_only"),
            AlignmentMode::HtAndLt => write!(f, "ht_and_lt"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MtfMaAlignment {
    pub ht_ma_len: usize,
    pub lt_ma_len: usize,
    pub alignment_mode: AlignmentMode,
    pub cap: f64,
}

impl Default for MtfMaAlignment {
    fn default() -> Self {
        Self {
            ht_ma_len: 50,
            lt_ma_len: 20,
            alignment_mode: AlignmentMode::HtOnly,
            cap: 0.4,
        }
    }
}

impl MtfMaAlignment {
    pub fn new(ht_ma_len: usize, lt_ma_len: usize, alignment_mode: AlignmentMode) -> Self {
        Self {
            ht_ma_len,
            lt_ma_len,
            alignment_mode,
            ..Self::default()
        }
    }

    pub fn from_config(config: &dyn ConfigPort, section: &str) -> Result<Self, TradesimError> {
        let d = Self::default();
        let alignment_mode = match config.get_string(section, "alignment_mode") {
            None => d.alignment_mode,
            Some(raw) => raw
                .parse()
                .map_err(|reason: String| TradesimError::invalid(section, "alignment_mode", reason))?,
        };
        Ok(Self {
            ht_ma_len: read_period(config, section, "ht_ma_len", d.ht_ma_len)?,
            lt_ma_len: read_period(config, section, "lt_ma_len", d.lt_ma_len)?,
            alignment_mode,
            cap: read_positive(config, section, "cap", d.cap)?,
        })
    }

    pub fn compute_indicators(
        &self,
        id: SignalId,
        series: &mut MarketSeries,
    ) -> Result<(), TradesimError> {
        let closes = series.closes();
        let atr = calc_atr(series.bars(), ATR_LEN);
        series.insert_column(IndicatorKey::new(id, HT_MA), calculate_ema(&closes, self.ht_ma_len))?;
        series.insert_column(IndicatorKey::new(id, LT_MA), calculate_ema(&closes, self.lt_ma_len))?;
        series.insert_column(IndicatorKey::new(id, ATR), atr)
    }

    pub fn generate(&self, id: SignalId, window: &SeriesWindow<'_>, label: &str) -> SignalDecision {
        let (Some(ht), Some(lt)) = (
            window.value(&IndicatorKey::new(id, HT_MA)),
            window.value(&IndicatorKey::new(id, LT_MA)),
        ) else {
            return SignalDecision::neutral(label);
        };
        let close = window.current().close;
        let need_lt = self.alignment_mode == AlignmentMode::HtAndLt;
        let distance = |d: f64| match window.value(&IndicatorKey::new(id, ATR)) {
            Some(atr) if atr > 0.0 => d / atr,
            _ => d.abs(),
        };

        if close > ht && (!need_lt || lt > ht) {
            SignalDecision::long(clamp01(self.cap.min(distance(close - ht))), label)
        } else if close < ht && (!need_lt || lt < ht) {
            SignalDecision::short(clamp01(self.cap.min(distance(ht - close))), label)
        } else {
            SignalDecision::neutral(label)
        }
    }
}
