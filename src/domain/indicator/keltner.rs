//! Keltner Channels.
//!
//! - Middle: EMA(close, n)
//! - Upper: Middle + (multiplier × ATR(m))
//! - Lower: Middle - (multiplier × ATR(m))

use crate::domain::indicator::ema::calculate_ema;
use crate::domain::indicator_helpers::calc_atr;
use crate::domain::ohlcv::Bar;

#[derive(Debug, Clone)]
pub struct KeltnerChannels {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

pub fn calculate_keltner(
    bars: &[Bar],
    ema_period: usize,
    atr_period: usize,
    multiplier: f64,
) -> KeltnerChannels {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let middle = calculate_ema(&closes, ema_period);
    let atr = calc_atr(bars, atr_period);
    let upper = middle.iter().zip(&atr).map(|(m, a)| m + multiplier * a).collect();
    let lower = middle.iter().zip(&atr).map(|(m, a)| m - multiplier * a).collect();
    KeltnerChannels {
        upper,
        middle,
        lower,
    }
}
