//! Technical indicator columns.
//!
//! Every function returns one value per input element, with `f64::NAN`
//! marking warmup positions. Functions never look past the element they
//! are computing.

pub mod adx;
pub mod bollinger;
pub mod choppiness;
pub mod ema;
pub mod heikin_ashi;
pub mod keltner;
pub mod macd;
pub mod rsi;
pub mod stddev;
pub mod supertrend;
pub mod vwap;
pub mod wma;

pub use adx::{calculate_adx, AdxColumns};
pub use bollinger::{calculate_bollinger, BollingerBands};
pub use choppiness::calculate_choppiness;
pub use ema::calculate_ema;
pub use heikin_ashi::{calculate_heikin_ashi, HeikinAshi};
pub use keltner::{calculate_keltner, KeltnerChannels};
pub use macd::{calculate_macd, MacdColumns};
pub use rsi::calculate_rsi;
pub use stddev::{calculate_stddev, calculate_sample_stddev};
pub use supertrend::{calculate_supertrend, SupertrendColumns};
pub use vwap::calculate_session_vwap;
pub use wma::calculate_wma;

use std::fmt;
use std::str::FromStr;

use crate::domain::indicator_helpers::sma;

/// Moving average flavour used by crossover-style signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaKind {
    Sma,
    Ema,
    Wma,
}

impl MaKind {
    pub fn compute(self, values: &[f64], period: usize) -> Vec<f64> {
        match self {
            MaKind::Sma => sma(values, period),
            MaKind::Ema => calculate_ema(values, period),
            MaKind::Wma => calculate_wma(values, period),
        }
    }
}

impl FromStr for MaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sma" => Ok(MaKind::Sma),
            "ema" => Ok(MaKind::Ema),
            "wma" => Ok(MaKind::Wma),
            other => Err(format!("unknown moving average '{other}', expected sma, ema or wma")),
        }
    }
}

impl fmt::Display for MaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaKind::Sma => write!(f, "sma"),
            MaKind::Ema => write!(f, "ema"),
            MaKind::Wma => write!(f, "wma"),
        }
    }
}
