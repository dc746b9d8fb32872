//! Choppiness Index.
//!
//! CHOP(n) = 100 * log10(sum(TR, n) / (max(high, n) - min(low, n))) / log10(n)
//!
//! Values near 100 mean sideways markets, low values mean trending ones.
//! Undefined (NaN) when the n-bar range is zero.

use crate::domain::indicator_helpers::{rolling_max, rolling_min, true_ranges};
use crate::domain::ohlcv::Bar;

pub fn calculate_choppiness(bars: &[Bar], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; bars.len()];
    if period < 2 {
        return out;
    }

    let tr = true_ranges(bars);
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let hh = rolling_max(&highs, period);
    let ll = rolling_min(&lows, period);
    let log_n = (period as f64).log10();

    for i in (period - 1)..bars.len() {
        let range = hh[i] - ll[i];
        if range > 0.0 {
            let tr_sum: f64 = tr[i + 1 - period..=i].iter().sum();
            out[i] = 100.0 * (tr_sum / range).log10() / log_n;
        }
    }
    out
}
