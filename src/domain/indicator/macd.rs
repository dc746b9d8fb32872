//! MACD (Moving Average Convergence Divergence).
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of the MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Warmup: slow - 1 values for the line, plus signal - 1 for signal/histogram.

use crate::domain::indicator::ema::calculate_ema;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone)]
pub struct MacdColumns {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub fn calculate_macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> MacdColumns {
    let ema_fast = calculate_ema(values, fast);
    let ema_slow = calculate_ema(values, slow);
    let line: Vec<f64> = ema_fast.iter().zip(&ema_slow).map(|(f, s)| f - s).collect();
    let signal_line = calculate_ema(&line, signal);
    let histogram = line.iter().zip(&signal_line).map(|(l, s)| l - s).collect();
    MacdColumns {
        line,
        signal: signal_line,
        histogram,
    }
}
