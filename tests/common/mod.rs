#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use tradesim::domain::error::TradesimError;
use tradesim::domain::indicator::MaKind;
pub use tradesim::domain::ohlcv::Bar;
use tradesim::domain::order::{OrderKind, TradeOrder};
use tradesim::domain::position::Position;
use tradesim::domain::series::{MarketSeries, SeriesWindow};
use tradesim::domain::signal::{MaCrossover, SignalKind};
use tradesim::domain::strategy::{CompositeStrategy, Strategy, StrategySignal};

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

pub fn make_bar(timestamp: NaiveDateTime, close: f64) -> Bar {
    Bar::new(timestamp, close, close + 1.0, close - 1.0, close, 1000.0)
}

/// One bar per calendar day at midnight, starting 2024-01-01.
pub fn daily_series(closes: &[f64]) -> MarketSeries {
    let start = at(2024, 1, 1, 0, 0);
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(start + Duration::days(i as i64), c))
        .collect();
    MarketSeries::new("TEST", bars)
}

/// Hourly bars on consecutive days, `per_day` bars a day from 10:00.
pub fn hourly_series(days: u32, per_day: u32, close: f64) -> MarketSeries {
    let mut bars = Vec::new();
    for d in 0..days {
        for h in 0..per_day {
            bars.push(make_bar(at(2024, 3, 4 + d, 10 + h, 0), close + f64::from(d * per_day + h)));
        }
    }
    MarketSeries::new("TEST", bars)
}

/// SMA(1) against SMA(2) with no threshold.
pub fn crossover_kind() -> SignalKind {
    SignalKind::MaCrossover(MaCrossover::new(MaKind::Sma, 1, MaKind::Sma, 2))
}

pub fn crossover_strategy() -> CompositeStrategy {
    CompositeStrategy::new("crossover", vec![StrategySignal::entry("ma", crossover_kind())])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Entry(usize),
    Exit(usize),
}

/// Emits fixed orders at fixed bar indices and records every call it gets.
#[derive(Default)]
pub struct ScriptedStrategy {
    pub entries: HashMap<usize, OrderKind>,
    pub exits: HashMap<usize, OrderKind>,
    pub calls: RefCell<Vec<Call>>,
}

impl ScriptedStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry_at(mut self, bar: usize, kind: OrderKind) -> Self {
        self.entries.insert(bar, kind);
        self
    }

    pub fn exit_at(mut self, bar: usize, kind: OrderKind) -> Self {
        self.exits.insert(bar, kind);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn order(kind: Option<&OrderKind>, window: &SeriesWindow<'_>) -> Option<TradeOrder> {
        let bar = window.current();
        kind.map(|k| TradeOrder::new(*k, bar.close, bar.timestamp))
    }
}

impl Strategy for ScriptedStrategy {
    fn name(&self) -> &str {
        "scripted"
    }

    fn compute_indicators(&self, _series: &mut MarketSeries) -> Result<(), TradesimError> {
        Ok(())
    }

    fn entry_strategy(&self, window: &SeriesWindow<'_>) -> Option<TradeOrder> {
        self.calls.borrow_mut().push(Call::Entry(window.index()));
        Self::order(self.entries.get(&window.index()), window)
    }

    fn exit_strategy(&self, window: &SeriesWindow<'_>, _position: &Position) -> Option<TradeOrder> {
        self.calls.borrow_mut().push(Call::Exit(window.index()));
        Self::order(self.exits.get(&window.index()), window)
    }
}

pub fn write_temp_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
