//! Supertrend.
//!
//! Basic bands are `hl2 ± multiplier × ATR(n)`. A close above the previous
//! upper band turns the trend up and a close below the previous lower band
//! turns it down. Otherwise the trend holds and its active band may only
//! tighten. The line is the lower band in an uptrend and the upper band in a
//! downtrend.
//!
//! Direction is `+1` / `-1`, and `NaN` during ATR warmup and on bars with
//! non-finite prices.

use crate::domain::indicator_helpers::calc_atr;
use crate::domain::ohlcv::Bar;

#[derive(Debug, Clone)]
pub struct SupertrendColumns {
    pub line: Vec<f64>,
    pub direction: Vec<f64>,
}

pub fn calculate_supertrend(bars: &[Bar], period: usize, multiplier: f64) -> SupertrendColumns {
    let n = bars.len();
    let mut cols = SupertrendColumns {
        line: vec![f64::NAN; n],
        direction: vec![f64::NAN; n],
    };

    let atr = calc_atr(bars, period);
    let mut upper: Vec<f64> = Vec::with_capacity(n);
    let mut lower: Vec<f64> = Vec::with_capacity(n);
    for (bar, a) in bars.iter().zip(&atr) {
        let hl2 = (bar.high + bar.low) / 2.0;
        upper.push(hl2 + multiplier * a);
        lower.push(hl2 - multiplier * a);
    }

    let mut prev: Option<usize> = None;
    for i in 0..n {
        if !(upper[i].is_finite() && lower[i].is_finite() && bars[i].close.is_finite()) {
            continue;
        }
        let direction = match prev {
            None => 1.0,
            Some(p) => {
                let close = bars[i].close;
                if close > upper[p] {
                    1.0
                } else if close < lower[p] {
                    -1.0
                } else {
                    let held = cols.direction[p];
                    if held > 0.0 && lower[i] < lower[p] {
                        lower[i] = lower[p];
                    }
                    if held < 0.0 && upper[i] > upper[p] {
                        upper[i] = upper[p];
                    }
                    held
                }
            }
        };
        cols.direction[i] = direction;
        cols.line[i] = if direction > 0.0 { lower[i] } else { upper[i] };
        prev = Some(i);
    }
    cols
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bars(hlc: &[(f64, f64, f64)]) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        hlc.iter()
            .enumerate()
            .map(|(i, &(h, l, c))| {
                let ts = (start + chrono::Duration::days(i as i64))
                    .and_hms_opt(0, 0, 0)
                    .unwrap();
                Bar::new(ts, c, h, l, c, 1.0)
            })
            .collect()
    }

    #[test]
    fn flips_down_on_collapse_and_up_on_surge() {
        let b = bars(&[
            (11.0, 9.0, 10.0),
            (11.0, 9.0, 10.0),
            (11.0, 9.0, 10.0),
            (11.0, 9.0, 10.0),
            (6.0, 4.0, 5.0),
            (21.0, 19.0, 20.0),
        ]);
        let st = calculate_supertrend(&b, 3, 1.0);
        assert!(st.direction[1].is_nan());
        assert_eq!(st.direction[2], 1.0);
        assert!((st.line[2] - 8.0).abs() < 1e-12);
        assert_eq!(st.direction[3], 1.0);
        assert_eq!(st.direction[4], -1.0);
        // ATR(3) after the 6-point true range is 10/3
        assert!((st.line[4] - (5.0 + 10.0 / 3.0)).abs() < 1e-9);
        assert_eq!(st.direction[5], 1.0);
    }

    #[test]
    fn held_uptrend_band_only_tightens() {
        let b = bars(&[
            (11.0, 9.0, 10.0),
            (11.0, 9.0, 10.0),
            (11.0, 9.0, 10.0),
            (10.5, 8.5, 9.5),
        ]);
        let st = calculate_supertrend(&b, 3, 1.0);
        assert_eq!(st.direction[3], 1.0);
        assert!((st.line[3] - 8.0).abs() < 1e-12);
    }
}
