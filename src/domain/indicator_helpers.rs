//! Shared helpers for indicator calculations.
//!
//! All columns have one value per input bar. Bars inside the warmup window
//! hold `f64::NAN`.

use crate::domain::ohlcv::Bar;

/// Simple moving average over `period` values.
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }
    for i in (period - 1)..values.len() {
        let window = &values[i + 1 - period..=i];
        out[i] = window.iter().sum::<f64>() / period as f64;
    }
    out
}

/// Rolling maximum over `period` values.
pub fn rolling_max(values: &[f64], period: usize) -> Vec<f64> {
    rolling(values, period, f64::max)
}

/// Rolling minimum over `period` values.
pub fn rolling_min(values: &[f64], period: usize) -> Vec<f64> {
    rolling(values, period, f64::min)
}

fn rolling(values: &[f64], period: usize, pick: fn(f64, f64) -> f64) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }
    for i in (period - 1)..values.len() {
        let window = &values[i + 1 - period..=i];
        if window.iter().all(|v| v.is_finite()) {
            out[i] = window.iter().copied().fold(window[0], pick);
        }
    }
    out
}

/// True range per bar; the first bar uses high - low.
pub fn true_ranges(bars: &[Bar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                bar.high - bar.low
            } else {
                bar.true_range(bars[i - 1].close)
            }
        })
        .collect()
}

/// Average True Range with Wilder smoothing, seeded by the mean of the
/// first `period` true ranges.
pub fn calc_atr(bars: &[Bar], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; bars.len()];
    if period == 0 || bars.len() < period {
        return out;
    }

    let tr = true_ranges(bars);
    let mut atr = tr[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = atr;
    for i in period..bars.len() {
        atr = (atr * (period - 1) as f64 + tr[i]) / period as f64;
        out[i] = atr;
    }
    out
}
