//! Session VWAP.
//!
//! Cumulative `typical_price × volume` over cumulative volume, reset at each
//! calendar date. Undefined (NaN) until the session has traded volume and on
//! bars with non-finite prices or volume, which are left out of the sums.

use crate::domain::ohlcv::Bar;

pub fn calculate_session_vwap(bars: &[Bar]) -> Vec<f64> {
    let mut out = vec![f64::NAN; bars.len()];
    let mut session = None;
    let mut cum_pv = 0.0;
    let mut cum_vol = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        if session != Some(bar.date()) {
            session = Some(bar.date());
            cum_pv = 0.0;
            cum_vol = 0.0;
        }
        if !(bar.has_finite_prices() && bar.volume.is_finite()) {
            continue;
        }
        cum_pv += bar.typical_price() * bar.volume;
        cum_vol += bar.volume;
        if cum_vol > 0.0 {
            out[i] = cum_pv / cum_vol;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(day: u32, hour: u32, price: f64, volume: f64) -> Bar {
        let ts = NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap();
        Bar::new(ts, price, price, price, price, volume)
    }

    #[test]
    fn volume_weighted_and_reset_per_session() {
        let vwap = calculate_session_vwap(&[
            bar(2, 10, 10.0, 1.0),
            bar(2, 11, 13.0, 2.0),
            bar(3, 10, 20.0, 5.0),
        ]);
        assert!((vwap[0] - 10.0).abs() < 1e-12);
        assert!((vwap[1] - 12.0).abs() < 1e-12);
        assert!((vwap[2] - 20.0).abs() < 1e-12);
    }

    #[test]
    fn no_volume_is_undefined() {
        let vwap = calculate_session_vwap(&[bar(2, 10, 10.0, 0.0)]);
        assert!(vwap[0].is_nan());
    }
}
