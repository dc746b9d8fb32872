//! Heikin-Ashi candles.
//!
//! - HA close: (open + high + low + close) / 4
//! - HA open: (previous HA open + previous HA close) / 2, seeded with
//!   (open + close) / 2
//! - HA high / low: extremes of high / low and the HA open and close
//!
//! A bar with non-finite prices yields `NaN` and the next bar re-seeds.

use crate::domain::ohlcv::Bar;

#[derive(Debug, Clone)]
pub struct HeikinAshi {
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
}

pub fn calculate_heikin_ashi(bars: &[Bar]) -> HeikinAshi {
    let n = bars.len();
    let mut ha = HeikinAshi {
        open: vec![f64::NAN; n],
        high: vec![f64::NAN; n],
        low: vec![f64::NAN; n],
        close: vec![f64::NAN; n],
    };

    for (i, bar) in bars.iter().enumerate() {
        if !bar.has_finite_prices() {
            continue;
        }
        let close = (bar.open + bar.high + bar.low + bar.close) / 4.0;
        let open = match i.checked_sub(1) {
            Some(p) if ha.open[p].is_finite() => (ha.open[p] + ha.close[p]) / 2.0,
            _ => (bar.open + bar.close) / 2.0,
        };
        ha.open[i] = open;
        ha.close[i] = close;
        ha.high[i] = bar.high.max(open).max(close);
        ha.low[i] = bar.low.min(open).min(close);
    }
    ha
}
