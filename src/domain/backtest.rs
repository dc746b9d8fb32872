//! Backtest parameters and the bar-by-bar simulation loop.
//!
//! Per bar, exactly one of the strategy's entry or exit methods runs. Forced
//! closes (exit time limit, holding-day limit, end of session without swing
//! trading) replace the exit call for that bar. A position still open after
//! the last bar is closed at the last valid close.

use chrono::NaiveTime;
use tracing::{debug, info, warn};

use crate::domain::error::{RunAborted, TradesimError, TransitionError};
use crate::domain::ohlcv::Bar;
use crate::domain::order::{OrderKind, TradeOrder};
use crate::domain::position::Position;
use crate::domain::series::{IntegrityPolicy, MarketSeries};
use crate::domain::strategy::Strategy;
use crate::domain::trade_registry::TradeRegistry;

pub const END_OF_DATA: &str = "end of data";
pub const EXIT_TIME_LIMIT: &str = "exit time limit";
pub const MAX_TRADE_DAY: &str = "max trade day";
pub const SESSION_END: &str = "session end";

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BacktestParameters {
    pub point_value: f64,
    pub cost_per_trade: f64,
    pub permit_swingtrade: bool,
    /// Entries are suppressed on bars whose time of day is later than this.
    pub entry_time_limit: Option<NaiveTime>,
    /// Open positions are closed on the first bar at or after this time.
    pub exit_time_limit: Option<NaiveTime>,
    /// Calendar days a position may span before it is force-closed.
    pub max_trade_day: Option<u32>,
    /// Skip the exit check on the bar right after an entry.
    pub bypass_first_exit_check: bool,
}

impl Default for BacktestParameters {
    fn default() -> Self {
        Self {
            point_value: 1.0,
            cost_per_trade: 0.0,
            permit_swingtrade: true,
            entry_time_limit: None,
            exit_time_limit: None,
            max_trade_day: None,
            bypass_first_exit_check: false,
        }
    }
}

impl BacktestParameters {
    pub fn validate(&self) -> Result<(), TradesimError> {
        if !(self.point_value.is_finite() && self.point_value > 0.0) {
            return Err(TradesimError::invalid(
                "backtest",
                "point_value",
                format!("must be positive, got {}", self.point_value),
            ));
        }
        if !(self.cost_per_trade.is_finite() && self.cost_per_trade >= 0.0) {
            return Err(TradesimError::invalid(
                "backtest",
                "cost_per_trade",
                format!("must be non-negative, got {}", self.cost_per_trade),
            ));
        }
        if let (Some(entry), Some(exit)) = (self.entry_time_limit, self.exit_time_limit) {
            if entry > exit {
                return Err(TradesimError::invalid(
                    "backtest",
                    "entry_time_limit",
                    format!("{entry} is later than exit_time_limit {exit}"),
                ));
            }
        }
        Ok(())
    }

    fn forced_close_reason(&self, position: &Position, bar: &Bar, session_end: bool) -> Option<&'static str> {
        if self.exit_time_limit.is_some_and(|limit| bar.time() >= limit) {
            return Some(EXIT_TIME_LIMIT);
        }
        if let Some(max_days) = self.max_trade_day {
            let held = (bar.date() - position.entry_time.date()).num_days();
            if held > i64::from(max_days) {
                return Some(MAX_TRADE_DAY);
            }
        }
        if !self.permit_swingtrade && session_end {
            return Some(SESSION_END);
        }
        None
    }

    fn entry_allowed(&self, bar: &Bar, session_end: bool) -> bool {
        let time = bar.time();
        if self.entry_time_limit.is_some_and(|limit| time > limit) {
            return false;
        }
        if self.exit_time_limit.is_some_and(|limit| time >= limit) {
            return false;
        }
        self.permit_swingtrade || !session_end
    }
}

/// Parses `HH:MM` or `HH:MM:SS`.
pub fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

/// True when bar `i` is the last tradable bar of its calendar day in `bars`.
/// Bars with non-finite prices are never traded, so they are skipped when
/// looking ahead.
fn is_session_end(bars: &[Bar], i: usize) -> bool {
    match bars[i + 1..].iter().find(|b| b.has_finite_prices()) {
        Some(next) => next.date() != bars[i].date(),
        None => true,
    }
}

type ProgressFn<'a> = Box<dyn FnMut(f64) + 'a>;

/// Runs one strategy over one series.
///
/// An engine owns nothing shared; independent engines can run in parallel.
pub struct Engine<'a> {
    parameters: BacktestParameters,
    integrity: IntegrityPolicy,
    progress_every: usize,
    progress: Option<ProgressFn<'a>>,
}

impl<'a> Engine<'a> {
    pub fn new(parameters: BacktestParameters) -> Self {
        Self {
            parameters,
            integrity: IntegrityPolicy::default(),
            progress_every: 0,
            progress: None,
        }
    }

    pub fn with_integrity_policy(mut self, policy: IntegrityPolicy) -> Self {
        self.integrity = policy;
        self
    }

    /// Calls `callback` with the completed percentage every `every` bars and
    /// after the last bar.
    pub fn with_progress(mut self, every: usize, callback: impl FnMut(f64) + 'a) -> Self {
        self.progress_every = every.max(1);
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn parameters(&self) -> &BacktestParameters {
        &self.parameters
    }

    fn report_progress(&mut self, done: usize, total: usize) {
        if let Some(callback) = self.progress.as_mut() {
            if done % self.progress_every == 0 || done == total {
                callback(done as f64 / total as f64 * 100.0);
            }
        }
    }

    pub fn run(
        &mut self,
        strategy: &dyn Strategy,
        series: &mut MarketSeries,
    ) -> Result<TradeRegistry, TradesimError> {
        self.parameters.validate()?;
        series.validate(&self.integrity)?;

        series.reset_indicators();
        strategy.compute_indicators(series)?;
        series.seal_indicators();
        let series: &MarketSeries = series;

        let params = self.parameters.clone();
        let bars = series.bars();
        let total = bars.len();
        info!(
            strategy = strategy.name(),
            symbol = series.symbol(),
            bars = total,
            "backtest started"
        );

        let mut registry = TradeRegistry::new(params.point_value, params.cost_per_trade);
        let mut entry_bar: Option<usize> = None;
        let mut last_valid_bar: Option<usize> = None;

        for i in 0..total {
            let Some(window) = series.window(i) else {
                break;
            };
            let bar = window.current();
            if !bar.has_finite_prices() {
                self.report_progress(i + 1, total);
                continue;
            }
            let session_end = is_session_end(bars, i);

            let order = match registry.position() {
                Some(position) => {
                    if let Some(reason) = params.forced_close_reason(position, bar, session_end) {
                        debug!(bar = i, reason, "forced close");
                        Some(
                            TradeOrder::new(OrderKind::Close, bar.close, bar.timestamp)
                                .with_amount(position.amount)
                                .with_comment(reason),
                        )
                    } else if params.bypass_first_exit_check && entry_bar.is_some_and(|e| i == e + 1) {
                        None
                    } else {
                        strategy.exit_strategy(&window, position)
                    }
                }
                None if params.entry_allowed(bar, session_end) => strategy.entry_strategy(&window),
                None => None,
            };

            if let Some(order) = order {
                let kind = order.kind;
                debug!(bar = i, order = %kind, price = order.price, "order");
                if let Err(reason) = registry.register(order) {
                    return Err(abort(registry, i, last_valid_bar, reason));
                }
                if matches!(kind, OrderKind::Buy | OrderKind::Sell | OrderKind::Invert) {
                    entry_bar = Some(i);
                }
            }

            last_valid_bar = Some(i);
            self.report_progress(i + 1, total);
        }

        if let Some(position) = registry.position() {
            if let Some(last) = bars.iter().rposition(Bar::has_finite_prices) {
                let bar = &bars[last];
                let order = TradeOrder::new(OrderKind::Close, bar.close, bar.timestamp)
                    .with_amount(position.amount)
                    .with_comment(END_OF_DATA);
                debug!(bar = last, "closing position at end of data");
                if let Err(reason) = registry.register(order) {
                    return Err(abort(registry, last, last_valid_bar, reason));
                }
            }
        }

        info!(
            strategy = strategy.name(),
            trades = registry.trades().len(),
            orders = registry.orders().len(),
            "backtest finished"
        );
        Ok(registry)
    }
}

fn abort(
    mut registry: TradeRegistry,
    bar_index: usize,
    last_valid_bar: Option<usize>,
    reason: TransitionError,
) -> TradesimError {
    warn!(bar = bar_index, %reason, trades = registry.trades().len(), "backtest aborted");
    registry.mark_truncated();
    TradesimError::RunAborted(Box::new(RunAborted {
        bar_index,
        last_valid_bar,
        reason,
        partial: registry,
    }))
}

/// One-shot run with default integrity checks and no progress reporting.
pub fn run_backtest(
    parameters: &BacktestParameters,
    strategy: &dyn Strategy,
    series: &mut MarketSeries,
) -> Result<TradeRegistry, TradesimError> {
    Engine::new(parameters.clone()).run(strategy, series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(day: u32, hour: u32) -> Bar {
        let ts = NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap();
        Bar::new(ts, 10.0, 10.0, 10.0, 10.0, 1.0)
    }

    #[test]
    fn default_parameters_are_valid() {
        assert!(BacktestParameters::default().validate().is_ok());
    }

    #[test]
    fn non_positive_point_value_is_rejected() {
        let params = BacktestParameters {
            point_value: 0.0,
            ..BacktestParameters::default()
        };
        let err = params.validate().unwrap_err();
        assert!(matches!(err, TradesimError::ConfigInvalid { ref key, .. } if key == "point_value"));
    }

    #[test]
    fn negative_cost_is_rejected() {
        let params = BacktestParameters {
            cost_per_trade: -1.0,
            ..BacktestParameters::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn entry_limit_after_exit_limit_is_rejected() {
        let params = BacktestParameters {
            entry_time_limit: parse_time_of_day("16:00"),
            exit_time_limit: parse_time_of_day("15:00"),
            ..BacktestParameters::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn time_of_day_formats() {
        assert_eq!(parse_time_of_day("09:30"), NaiveTime::from_hms_opt(9, 30, 0));
        assert_eq!(parse_time_of_day(" 17:45:10 "), NaiveTime::from_hms_opt(17, 45, 10));
        assert_eq!(parse_time_of_day("25:00"), None);
    }

    #[test]
    fn session_end_detection() {
        let bars = vec![bar(2, 10), bar(2, 11), bar(3, 10)];
        assert!(!is_session_end(&bars, 0));
        assert!(is_session_end(&bars, 1));
        assert!(is_session_end(&bars, 2));
    }

    #[test]
    fn session_end_skips_unpriced_bars() {
        let mut gap = bar(2, 12);
        gap.close = f64::NAN;
        let bars = vec![bar(2, 10), bar(2, 11), gap, bar(3, 10)];
        assert!(!is_session_end(&bars, 0));
        assert!(is_session_end(&bars, 1));
    }

    #[test]
    fn entry_window_respects_limits() {
        let params = BacktestParameters {
            entry_time_limit: parse_time_of_day("10:00"),
            exit_time_limit: parse_time_of_day("16:00"),
            ..BacktestParameters::default()
        };
        assert!(params.entry_allowed(&bar(2, 10), false));
        assert!(!params.entry_allowed(&bar(2, 11), false));

        let no_swing = BacktestParameters {
            permit_swingtrade: false,
            ..BacktestParameters::default()
        };
        assert!(no_swing.entry_allowed(&bar(2, 10), false));
        assert!(!no_swing.entry_allowed(&bar(2, 10), true));
    }
}
