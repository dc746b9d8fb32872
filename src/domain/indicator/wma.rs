//! Weighted Moving Average.
//!
//! Sliding-window form: the weighted sum gains `n*V[i]` and loses the
//! previous window sum on each step.
//! WMA(n) = (1*V[i-n+1] + 2*V[i-n+2] + ... + n*V[i]) / (n*(n+1)/2)

pub fn calculate_wma(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }

    let divisor = (period * (period + 1)) as f64 / 2.0;
    let mut weighted_sum = 0.0;
    let mut window_sum = 0.0;

    for (i, &v) in values.iter().enumerate() {
        if i < period {
            weighted_sum += (i + 1) as f64 * v;
            window_sum += v;
        } else {
            weighted_sum += period as f64 * v - window_sum;
            window_sum += v - values[i - period];
        }
        if i + 1 >= period {
            out[i] = weighted_sum / divisor;
        }
    }
    out
}
