//! Rolling standard deviation.
//!
//! `calculate_stddev` is the population form (divides by n) used for
//! Bollinger bands. `calculate_sample_stddev` divides by n-1 and is used to
//! normalize momentum histograms.

pub fn calculate_stddev(values: &[f64], period: usize) -> Vec<f64> {
    rolling_std(values, period, 0)
}

pub fn calculate_sample_stddev(values: &[f64], period: usize) -> Vec<f64> {
    rolling_std(values, period, 1)
}

fn rolling_std(values: &[f64], period: usize, ddof: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period <= ddof {
        return out;
    }
    for i in (period - 1)..values.len() {
        let window = &values[i + 1 - period..=i];
        let mean = window.iter().sum::<f64>() / period as f64;
        let variance = window
            .iter()
            .map(|v| {
                let diff = v - mean;
                diff * diff
            })
            .sum::<f64>()
            / (period - ddof) as f64;
        out[i] = variance.sqrt();
    }
    out
}
