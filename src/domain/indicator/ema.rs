//! Exponential Moving Average.
//!
//! k = 2/(n+1), seeded with the SMA of the first n finite values, then
//! EMA[i] = V[i]*k + EMA[i-1]*(1-k). Leading `NaN`s in the input (for
//! example another indicator's warmup) are skipped before seeding.

pub fn calculate_ema(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }
    let Some(start) = values.iter().position(|v| v.is_finite()) else {
        return out;
    };
    let seed_end = start + period - 1;
    if seed_end >= values.len() {
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = values[start..=seed_end].iter().sum::<f64>() / period as f64;
    out[seed_end] = ema;
    for i in (seed_end + 1)..values.len() {
        ema = values[i] * k + ema * (1.0 - k);
        out[i] = ema;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_warmup() {
        let out = calculate_ema(&[10.0, 20.0, 30.0, 40.0, 50.0], 3);
        assert!(out[0].is_nan());
        assert!(out[1].is_nan());
        assert!(out[2..].iter().all(|v| v.is_finite()));
    }

    #[test]
    fn ema_period_1_tracks_input() {
        let out = calculate_ema(&[10.0, 20.0, 30.0], 1);
        assert!((out[0] - 10.0).abs() < f64::EPSILON);
        assert!((out[2] - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_recursive_calculation() {
        let out = calculate_ema(&[10.0, 20.0, 30.0, 40.0, 50.0], 3);
        let k = 2.0 / 4.0;
        let sma = 20.0;
        assert!((out[2] - sma).abs() < f64::EPSILON);
        let ema_3 = 40.0 * k + sma * (1.0 - k);
        assert!((out[3] - ema_3).abs() < f64::EPSILON);
        let ema_4 = 50.0 * k + ema_3 * (1.0 - k);
        assert!((out[4] - ema_4).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_skips_leading_nan() {
        let out = calculate_ema(&[f64::NAN, f64::NAN, 3.0, 6.0, 9.0], 2);
        assert!(out[2].is_nan());
        assert!((out[3] - 4.5).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_short_input_is_all_warmup() {
        assert!(calculate_ema(&[1.0, 2.0], 5).iter().all(|v| v.is_nan()));
        assert!(calculate_ema(&[], 3).is_empty());
        assert!(calculate_ema(&[1.0], 0)[0].is_nan());
    }
}
