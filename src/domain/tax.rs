//! Monthly tax settlement.
//!
//! Trades are bucketed by the calendar month of their exit. Within a month
//! the pre-tax results of day trades and swing trades are summed separately.
//! A month whose combined result is not positive owes nothing, and nothing
//! carries into the next month. Otherwise a losing class offsets the winning
//! one, which is taxed at its own rate. The month's tax for a class is then
//! spread over that class's winning trades in proportion to their pre-tax
//! result.

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::domain::position::{ClosedTrade, TaxClass};

pub const DAY_TRADE_RATE: f64 = 0.20;
pub const SWING_TRADE_RATE: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TaxRates {
    pub day_trade: f64,
    pub swing_trade: f64,
}

impl Default for TaxRates {
    fn default() -> Self {
        Self {
            day_trade: DAY_TRADE_RATE,
            swing_trade: SWING_TRADE_RATE,
        }
    }
}

impl TaxRates {
    pub fn rate(&self, class: TaxClass) -> f64 {
        match class {
            TaxClass::DayTrade => self.day_trade,
            TaxClass::SwingTrade => self.swing_trade,
        }
    }
}

/// First day of the month a timestamp falls in.
pub fn month_key(ts: NaiveDateTime) -> NaiveDate {
    ts.date().with_day(1).unwrap_or(ts.date())
}

/// Tax owed by one month given its per-class pre-tax sums, as
/// `(day_tax, swing_tax)`.
pub fn month_tax(day_sum: f64, swing_sum: f64, rates: &TaxRates) -> (f64, f64) {
    if day_sum + swing_sum <= 0.0 {
        return (0.0, 0.0);
    }
    let (day_base, swing_base) = if day_sum < 0.0 {
        (0.0, swing_sum + day_sum)
    } else if swing_sum < 0.0 {
        (day_sum + swing_sum, 0.0)
    } else {
        (day_sum, swing_sum)
    };
    (day_base * rates.day_trade, swing_base * rates.swing_trade)
}

/// Recomputes `tax` and `net_pnl` of every trade in one month.
///
/// All trades passed in must share an exit month.
pub fn settle_month(trades: &mut [ClosedTrade], rates: &TaxRates) {
    let class_sum = |class: TaxClass, trades: &[ClosedTrade]| -> f64 {
        trades
            .iter()
            .filter(|t| t.tax_class() == class)
            .map(ClosedTrade::pre_tax)
            .sum()
    };
    let day_sum = class_sum(TaxClass::DayTrade, trades);
    let swing_sum = class_sum(TaxClass::SwingTrade, trades);
    let (day_tax, swing_tax) = month_tax(day_sum, swing_sum, rates);

    let winners = |class: TaxClass, trades: &[ClosedTrade]| -> f64 {
        trades
            .iter()
            .filter(|t| t.tax_class() == class && t.pre_tax() > 0.0)
            .map(ClosedTrade::pre_tax)
            .sum()
    };
    let day_winners = winners(TaxClass::DayTrade, trades);
    let swing_winners = winners(TaxClass::SwingTrade, trades);

    for trade in trades.iter_mut() {
        let (class_tax, class_winners) = match trade.tax_class() {
            TaxClass::DayTrade => (day_tax, day_winners),
            TaxClass::SwingTrade => (swing_tax, swing_winners),
        };
        let pre_tax = trade.pre_tax();
        trade.tax = if class_tax > 0.0 && pre_tax > 0.0 && class_winners > 0.0 {
            class_tax * pre_tax / class_winners
        } else {
            0.0
        };
        trade.net_pnl = pre_tax - trade.tax;
    }
}

/// Settles every month of a chronologically ordered trade list.
pub fn settle_all(trades: &mut [ClosedTrade], rates: &TaxRates) {
    let mut start = 0;
    while start < trades.len() {
        let key = month_key(trades[start].exit_time);
        let end = trades[start..]
            .iter()
            .position(|t| month_key(t.exit_time) != key)
            .map_or(trades.len(), |offset| start + offset);
        settle_month(&mut trades[start..end], rates);
        start = end;
    }
}
