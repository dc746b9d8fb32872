//! ADX with directional movement (+DI / -DI), Wilder smoothing.
//!
//! +DM = up move when it beats the down move and is positive, else 0 (and
//! symmetrically for -DM). TR, +DM and -DM are smoothed with a mean seed over
//! the first n moves; DI = 100 * smoothed DM / smoothed TR;
//! DX = 100 * |+DI - -DI| / (+DI + -DI); ADX is the Wilder average of DX.
//!
//! Warmup: n values for DI, 2n - 1 for ADX.

use crate::domain::indicator_helpers::true_ranges;
use crate::domain::ohlcv::Bar;

#[derive(Debug, Clone)]
pub struct AdxColumns {
    pub adx: Vec<f64>,
    pub plus_di: Vec<f64>,
    pub minus_di: Vec<f64>,
}

pub fn calculate_adx(bars: &[Bar], period: usize) -> AdxColumns {
    let n = bars.len();
    let mut cols = AdxColumns {
        adx: vec![f64::NAN; n],
        plus_di: vec![f64::NAN; n],
        minus_di: vec![f64::NAN; n],
    };
    if period == 0 || n <= period {
        return cols;
    }

    let tr = true_ranges(bars);
    let mut plus_dm = vec![0.0; n];
    let mut minus_dm = vec![0.0; n];
    for i in 1..n {
        let up = bars[i].high - bars[i - 1].high;
        let down = bars[i - 1].low - bars[i].low;
        if up > down && up > 0.0 {
            plus_dm[i] = up;
        }
        if down > up && down > 0.0 {
            minus_dm[i] = down;
        }
    }

    let p = period as f64;
    let seed = |xs: &[f64]| xs[1..=period].iter().sum::<f64>() / p;
    let mut s_tr = seed(&tr);
    let mut s_plus = seed(&plus_dm);
    let mut s_minus = seed(&minus_dm);

    let mut dx = vec![f64::NAN; n];
    for i in period..n {
        if i > period {
            s_tr = (s_tr * (p - 1.0) + tr[i]) / p;
            s_plus = (s_plus * (p - 1.0) + plus_dm[i]) / p;
            s_minus = (s_minus * (p - 1.0) + minus_dm[i]) / p;
        }
        let (pdi, mdi) = if s_tr > 0.0 {
            (100.0 * s_plus / s_tr, 100.0 * s_minus / s_tr)
        } else {
            (0.0, 0.0)
        };
        cols.plus_di[i] = pdi;
        cols.minus_di[i] = mdi;
        dx[i] = if pdi + mdi > 0.0 {
            100.0 * (pdi - mdi).abs() / (pdi + mdi)
        } else {
            0.0
        };
    }

    let adx_start = 2 * period - 1;
    if adx_start < n {
        let mut adx = dx[period..=adx_start].iter().sum::<f64>() / p;
        cols.adx[adx_start] = adx;
        for i in (adx_start + 1)..n {
            adx = (adx * (p - 1.0) + dx[i]) / p;
            cols.adx[i] = adx;
        }
    }
    cols
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bars_from(highs_lows: &[(f64, f64)]) -> Vec<Bar> {
        highs_lows
            .iter()
            .enumerate()
            .map(|(i, &(h, l))| {
                let ts = NaiveDate::from_ymd_opt(2024, 1, 1 + i as u32)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap();
                Bar::new(ts, (h + l) / 2.0, h, l, (h + l) / 2.0, 1.0)
            })
            .collect()
    }

    fn uptrend(n: usize) -> Vec<Bar> {
        let hl: Vec<(f64, f64)> = (0..n).map(|i| (11.0 + i as f64, 9.0 + i as f64)).collect();
        bars_from(&hl)
    }

    #[test]
    fn warmup_lengths() {
        let cols = calculate_adx(&uptrend(12), 3);
        assert!(cols.plus_di[2].is_nan());
        assert!(cols.plus_di[3].is_finite());
        assert!(cols.adx[4].is_nan());
        assert!(cols.adx[5].is_finite());
    }

    #[test]
    fn steady_uptrend_is_all_plus_di() {
        let cols = calculate_adx(&uptrend(20), 5);
        assert!(cols.plus_di[19] > 0.0);
        assert!(cols.minus_di[19].abs() < f64::EPSILON);
        // DX is 100 on every bar, so ADX converges to 100
        assert!((cols.adx[19] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn downtrend_flips_direction() {
        let hl: Vec<(f64, f64)> = (0..20).map(|i| (31.0 - i as f64, 29.0 - i as f64)).collect();
        let cols = calculate_adx(&bars_from(&hl), 5);
        assert!(cols.minus_di[19] > cols.plus_di[19]);
    }

    #[test]
    fn short_input_is_all_warmup() {
        let cols = calculate_adx(&uptrend(3), 5);
        assert!(cols.adx.iter().all(|v| v.is_nan()));
        assert!(cols.plus_di.iter().all(|v| v.is_nan()));
    }
}
