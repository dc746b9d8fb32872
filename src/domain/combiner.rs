//! Aggregation policies over the decisions of one bar.
//!
//! All policies tally `long_sum` and `short_sum` as weighted strengths. The
//! consensus side is the sign of `net = long_sum - short_sum` and its
//! strength is `min(1, |net| / (long_sum + short_sum))`. A net of exactly
//! zero is always neutral. [`Combiner::Agreement`] is the exception: it
//! ignores weights and only looks at regime and direction.

use crate::domain::signal::{clamp01, Regime, Side, SignalDecision};

/// How a signal participates in a [`Combiner::Gated`] vote. Other policies
/// treat both roles alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalRole {
    Entry,
    Filter,
}

#[derive(Debug, Clone, Copy)]
pub struct Vote<'a> {
    pub decision: &'a SignalDecision,
    pub role: SignalRole,
    pub weight: f64,
    /// Regime reported by a regime filter; `None` for every other signal.
    pub regime: Option<Regime>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Consensus {
    pub side: Side,
    pub strength: f64,
}

impl Consensus {
    pub const NEUTRAL: Consensus = Consensus {
        side: Side::Neutral,
        strength: 0.0,
    };
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Combiner {
    /// Sign of the weighted net score.
    #[default]
    WeightedVote,
    /// Weighted vote that stays neutral while `|net| < threshold`.
    ThresholdedWeightedVote { threshold: f64 },
    /// Filters must be active (all or any) and agree on a side before the
    /// entry signals vote; the entry consensus must land on that side.
    Gated {
        require_all_filters: bool,
        require_entry_agreement: bool,
    },
    /// Trades only in a ranging regime, and only when every active entry
    /// signal points the same way. The result has full strength.
    Agreement,
}

impl Combiner {
    pub fn name(&self) -> &'static str {
        match self {
            Combiner::WeightedVote => "weighted_vote",
            Combiner::ThresholdedWeightedVote { .. } => "thresholded",
            Combiner::Gated { .. } => "gated",
            Combiner::Agreement => "agreement",
        }
    }

    pub fn combine(&self, votes: &[Vote<'_>]) -> Consensus {
        match self {
            Combiner::WeightedVote => weighted(votes.iter()).consensus(0.0),
            Combiner::ThresholdedWeightedVote { threshold } => {
                weighted(votes.iter()).consensus(threshold.max(0.0))
            }
            Combiner::Gated {
                require_all_filters,
                require_entry_agreement,
            } => gated(votes, *require_all_filters, *require_entry_agreement),
            Combiner::Agreement => agreement(votes),
        }
    }
}

#[derive(Debug, Default)]
struct Tally {
    long_sum: f64,
    short_sum: f64,
}

impl Tally {
    fn consensus(&self, threshold: f64) -> Consensus {
        let net = self.long_sum - self.short_sum;
        let total = self.long_sum + self.short_sum;
        if total == 0.0 || net == 0.0 || net.abs() < threshold {
            return Consensus::NEUTRAL;
        }
        Consensus {
            side: if net > 0.0 { Side::Long } else { Side::Short },
            strength: (net.abs() / total).min(1.0),
        }
    }
}

fn weighted<'a, I>(votes: I) -> Tally
where
    I: Iterator<Item = &'a Vote<'a>>,
{
    let mut tally = Tally::default();
    for vote in votes {
        let w = if vote.weight.is_finite() { vote.weight.max(0.0) } else { 0.0 };
        let s = clamp01(vote.decision.strength) * w;
        match vote.decision.side {
            Side::Long => tally.long_sum += s,
            Side::Short => tally.short_sum += s,
            Side::Neutral => {}
        }
    }
    tally
}

fn is_active(decision: &SignalDecision) -> bool {
    !decision.side.is_neutral() && decision.strength > 0.0
}

fn gated(votes: &[Vote<'_>], require_all_filters: bool, require_entry_agreement: bool) -> Consensus {
    let filters: Vec<&Vote<'_>> = votes.iter().filter(|v| v.role == SignalRole::Filter).collect();
    let entries: Vec<&Vote<'_>> = votes.iter().filter(|v| v.role == SignalRole::Entry).collect();

    let mut filter_side = Side::Neutral;
    if !filters.is_empty() {
        let active: Vec<Side> = filters
            .iter()
            .filter(|v| is_active(v.decision))
            .map(|v| v.decision.side)
            .collect();
        let passed = if require_all_filters {
            active.len() == filters.len()
        } else {
            !active.is_empty()
        };
        if !passed {
            return Consensus::NEUTRAL;
        }
        filter_side = active[0];
        if active.iter().any(|s| *s != filter_side) {
            return Consensus::NEUTRAL;
        }
    }

    if require_entry_agreement {
        let mut sides = entries
            .iter()
            .filter(|v| is_active(v.decision))
            .map(|v| v.decision.side);
        if let Some(first) = sides.next() {
            if sides.any(|s| s != first) {
                return Consensus::NEUTRAL;
            }
        }
    }

    let consensus = weighted(entries.into_iter()).consensus(0.0);
    if !filter_side.is_neutral() && consensus.side != filter_side {
        return Consensus::NEUTRAL;
    }
    consensus
}

fn agreement(votes: &[Vote<'_>]) -> Consensus {
    if votes.iter().find_map(|v| v.regime) != Some(Regime::Range) {
        return Consensus::NEUTRAL;
    }
    let mut sides = votes
        .iter()
        .filter(|v| v.role == SignalRole::Entry && is_active(v.decision))
        .map(|v| v.decision.side);
    let Some(side) = sides.next() else {
        return Consensus::NEUTRAL;
    };
    if sides.any(|s| s != side) {
        return Consensus::NEUTRAL;
    }
    Consensus {
        side,
        strength: 1.0,
    }
}
