//! The entry/exit strategy contract and its signal-composed implementation.

pub mod presets;

use crate::domain::combiner::{Combiner, Consensus, SignalRole, Vote};
use crate::domain::error::TradesimError;
use crate::domain::order::{DecisionInfo, OrderKind, TradeOrder};
use crate::domain::position::{Direction, Position};
use crate::domain::series::{MarketSeries, SeriesWindow};
use crate::domain::signal::{Side, SignalDecision, SignalId, SignalKind};

/// What the engine drives bar by bar.
///
/// `entry_strategy` is only asked while flat and `exit_strategy` only while a
/// position is open. Both see bars up to and including the current one.
pub trait Strategy {
    fn name(&self) -> &str;

    /// Writes derived columns once, before the first bar.
    fn compute_indicators(&self, series: &mut MarketSeries) -> Result<(), TradesimError>;

    fn entry_strategy(&self, window: &SeriesWindow<'_>) -> Option<TradeOrder>;

    fn exit_strategy(&self, window: &SeriesWindow<'_>, position: &Position) -> Option<TradeOrder>;
}

/// One signal bound into a composite strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategySignal {
    pub label: String,
    pub kind: SignalKind,
    pub role: SignalRole,
    pub weight: f64,
}

impl StrategySignal {
    pub fn entry(label: impl Into<String>, kind: SignalKind) -> Self {
        Self {
            label: label.into(),
            kind,
            role: SignalRole::Entry,
            weight: 1.0,
        }
    }

    pub fn filter(label: impl Into<String>, kind: SignalKind) -> Self {
        Self {
            role: SignalRole::Filter,
            ..Self::entry(label, kind)
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

/// Signals plus a combiner.
///
/// Flat: a long consensus buys, a short one sells. Open: an opposite
/// consensus inverts when `always_active`, otherwise closes. Every order is
/// filled at the current close and carries the per-signal breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeStrategy {
    name: String,
    signals: Vec<StrategySignal>,
    combiner: Combiner,
    always_active: bool,
    normalize_weights: bool,
    amount: f64,
}

impl CompositeStrategy {
    pub fn new(name: impl Into<String>, signals: Vec<StrategySignal>) -> Self {
        Self {
            name: name.into(),
            signals,
            combiner: Combiner::default(),
            always_active: false,
            normalize_weights: false,
            amount: 1.0,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_combiner(mut self, combiner: Combiner) -> Self {
        self.combiner = combiner;
        self
    }

    pub fn with_always_active(mut self, always_active: bool) -> Self {
        self.always_active = always_active;
        self
    }

    /// Scales weights so they sum to 1 before voting.
    pub fn with_normalized_weights(mut self, normalize: bool) -> Self {
        self.normalize_weights = normalize;
        self
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = amount;
        self
    }

    pub fn signals(&self) -> &[StrategySignal] {
        &self.signals
    }

    pub fn combiner(&self) -> &Combiner {
        &self.combiner
    }

    pub fn always_active(&self) -> bool {
        self.always_active
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// Decisions of every signal at the window's bar, in signal order.
    pub fn decisions(&self, window: &SeriesWindow<'_>) -> Vec<SignalDecision> {
        self.signals
            .iter()
            .enumerate()
            .map(|(i, s)| s.kind.generate(SignalId(i), window, &s.label))
            .collect()
    }

    fn effective_weights(&self) -> Vec<f64> {
        let raw: Vec<f64> = self.signals.iter().map(|s| s.weight).collect();
        if !self.normalize_weights {
            return raw;
        }
        let total: f64 = raw.iter().filter(|w| w.is_finite() && **w > 0.0).sum();
        if total > 0.0 {
            raw.iter().map(|w| w / total).collect()
        } else {
            raw
        }
    }

    /// Combined decision at the window's bar plus the breakdown behind it.
    pub fn aggregate(&self, window: &SeriesWindow<'_>) -> (Consensus, Vec<SignalDecision>) {
        let decisions = self.decisions(window);
        let weights = self.effective_weights();
        let votes: Vec<Vote<'_>> = self
            .signals
            .iter()
            .zip(&decisions)
            .zip(&weights)
            .enumerate()
            .map(|(i, ((s, d), w))| Vote {
                decision: d,
                role: s.role,
                weight: *w,
                regime: s.kind.regime(SignalId(i), window),
            })
            .collect();
        let consensus = self.combiner.combine(&votes);
        (consensus, decisions)
    }

    fn order(&self, kind: OrderKind, window: &SeriesWindow<'_>, decisions: &[SignalDecision]) -> TradeOrder {
        let bar = window.current();
        TradeOrder::new(kind, bar.close, bar.timestamp)
            .with_amount(self.amount)
            .with_info(DecisionInfo::from_decisions(decisions))
    }
}

impl Strategy for CompositeStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute_indicators(&self, series: &mut MarketSeries) -> Result<(), TradesimError> {
        for (i, s) in self.signals.iter().enumerate() {
            s.kind.compute_indicators(SignalId(i), series)?;
        }
        Ok(())
    }

    fn entry_strategy(&self, window: &SeriesWindow<'_>) -> Option<TradeOrder> {
        let (consensus, decisions) = self.aggregate(window);
        let kind = match consensus.side {
            Side::Long => OrderKind::Buy,
            Side::Short => OrderKind::Sell,
            Side::Neutral => return None,
        };
        Some(self.order(kind, window, &decisions))
    }

    fn exit_strategy(&self, window: &SeriesWindow<'_>, position: &Position) -> Option<TradeOrder> {
        let (consensus, decisions) = self.aggregate(window);
        if Direction::from_side(consensus.side) != Some(position.direction.opposite()) {
            return None;
        }
        let kind = if self.always_active {
            OrderKind::Invert
        } else {
            OrderKind::Close
        };
        Some(self.order(kind, window, &decisions))
    }
}
