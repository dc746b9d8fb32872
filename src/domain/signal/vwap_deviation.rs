//! Session VWAP deviation reversion.
//!
//! Tracks `close - VWAP` against its rolling sample standard deviation.
//! When the deviation returns inside `dev_mult` standard deviations after
//! being stretched beyond them, the signal fires back toward VWAP. Strength
//! is the remaining deviation in standard deviations.

use crate::domain::error::TradesimError;
use crate::domain::indicator::{calculate_sample_stddev, calculate_session_vwap};
use crate::domain::series::{IndicatorKey, MarketSeries, SeriesWindow};
use crate::domain::signal::registry::{read_period, read_positive};
use crate::domain::signal::{clamp01, SignalDecision, SignalId};
use crate::ports::config_port::ConfigPort;

pub const NAME: &str = "vwap_deviation";

const VWAP: &str = "vwap";
const DEV: &str = "vwap_dev";
const DEV_STD: &str = "vwap_dev_std";

#[derive(Debug, Clone, PartialEq)]
pub struct VwapDeviation {
    pub std_len: usize,
    pub dev_mult: f64,
}

impl Default for VwapDeviation {
    fn default() -> Self {
        Self {
            std_len: 20,
            dev_mult: 2.0,
        }
    }
}

impl VwapDeviation {
    pub fn from_config(config: &dyn ConfigPort, section: &str) -> Result<Self, TradesimError> {
        let d = Self::default();
        let std_len = read_period(config, section, "std_len", d.std_len)?;
        if std_len < 2 {
            return Err(TradesimError::invalid(section, "std_len", "std_len must be at least 2"));
        }
        Ok(Self {
            std_len,
            dev_mult: read_positive(config, section, "dev_mult", d.dev_mult)?,
        })
    }

    pub fn compute_indicators(
        &self,
        id: SignalId,
        series: &mut MarketSeries,
    ) -> Result<(), TradesimError> {
        let vwap = calculate_session_vwap(series.bars());
        let dev: Vec<f64> = series
            .bars()
            .iter()
            .zip(&vwap)
            .map(|(bar, v)| bar.close - v)
            .collect();
        let dev_std = calculate_sample_stddev(&dev, self.std_len);
        series.insert_column(IndicatorKey::new(id, VWAP), vwap)?;
        series.insert_column(IndicatorKey::new(id, DEV), dev)?;
        series.insert_column(IndicatorKey::new(id, DEV_STD), dev_std)
    }

    pub fn generate(&self, id: SignalId, window: &SeriesWindow<'_>, label: &str) -> SignalDecision {
        let dev_key = IndicatorKey::new(id, DEV);
        let (Some(dev), Some(prev_dev), Some(std)) = (
            window.value(&dev_key),
            window.value_back(&dev_key, 1),
            window.value(&IndicatorKey::new(id, DEV_STD)),
        ) else {
            return SignalDecision::neutral(label);
        };
        if std <= 0.0 {
            return SignalDecision::neutral(label);
        }
        let band = self.dev_mult * std;
        let strength = clamp01(dev.abs() / std);

        if prev_dev <= -band && dev > -band {
            SignalDecision::long(strength, label)
        } else if prev_dev >= band && dev < band {
            SignalDecision::short(strength, label)
        } else {
            SignalDecision::neutral(label)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::Bar;
    use crate::domain::signal::Side;
    use chrono::NaiveDate;

    /// One session of minute bars, unit volume.
    fn series(closes: &[f64]) -> MarketSeries {
        let open = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let ts = open + chrono::Duration::minutes(i as i64);
                Bar::new(ts, c, c, c, c, 1.0)
            })
            .collect();
        MarketSeries::new("TEST", bars)
    }

    fn last(closes: &[f64]) -> SignalDecision {
        let signal = VwapDeviation {
            std_len: 3,
            dev_mult: 1.0,
        };
        let mut s = series(closes);
        signal.compute_indicators(SignalId(0), &mut s).unwrap();
        signal.generate(SignalId(0), &s.window(closes.len() - 1).unwrap(), "vwap")
    }

    #[test]
    fn snap_back_from_below_is_long() {
        // deviations 0, 0, -4.8, 0.167 against a band of about 2.8
        let d = last(&[10.0, 10.0, 10.0, 10.0, 4.0, 9.0]);
        assert_eq!(d.side, Side::Long);
        assert!(d.strength > 0.0 && d.strength < 0.1);
    }

    #[test]
    fn snap_back_from_above_is_short() {
        let d = last(&[10.0, 10.0, 10.0, 10.0, 16.0, 11.0]);
        assert_eq!(d.side, Side::Short);
    }

    #[test]
    fn still_stretched_is_neutral() {
        assert_eq!(last(&[10.0, 10.0, 10.0, 10.0, 4.0]).side, Side::Neutral);
    }

    #[test]
    fn flat_session_is_neutral() {
        assert_eq!(last(&[10.0; 6]).side, Side::Neutral);
    }
}
