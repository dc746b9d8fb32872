//! Bollinger Bands.
//!
//! - Middle: SMA over n values
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! StdDev is the population form (divides by n).

use crate::domain::indicator::stddev::calculate_stddev;
use crate::domain::indicator_helpers::sma;

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone)]
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

pub fn calculate_bollinger(values: &[f64], period: usize, multiplier: f64) -> BollingerBands {
    let middle = sma(values, period);
    let std = calculate_stddev(values, period);
    let upper = middle.iter().zip(&std).map(|(m, s)| m + multiplier * s).collect();
    let lower = middle.iter().zip(&std).map(|(m, s)| m - multiplier * s).collect();
    BollingerBands {
        upper,
        middle,
        lower,
    }
}
