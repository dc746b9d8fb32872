//! Acceptance gates and composite scoring of a run's metrics.
//!
//! Each component is normalized into `[0, 1]` before weighting:
//!
//! | component     | sub-score                          |
//! |---------------|------------------------------------|
//! | profit factor | `(pf - 1) / 1.5`                   |
//! | drawdown      | `1 - dd / max_drawdown`            |
//! | win rate      | `(win_rate - 0.5) / 0.4`           |
//! | trades        | `(trades - min_trades) / min_trades` |
//! | sharpe        | `sharpe / 2`                       |
//! | cagr          | `cagr / target_cagr`               |

use std::fmt;

use crate::domain::metrics::MetricsSnapshot;
use crate::domain::signal::clamp01;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AcceptanceCriteria {
    pub min_trades: usize,
    pub min_profit_factor: f64,
    /// Largest tolerated drawdown as a fraction of the peak.
    pub max_drawdown: f64,
    pub min_sharpe: Option<f64>,
    pub min_cagr: Option<f64>,
    pub min_win_rate: Option<f64>,
    pub max_consecutive_losses: Option<usize>,
}

impl Default for AcceptanceCriteria {
    fn default() -> Self {
        Self {
            min_trades: 150,
            min_profit_factor: 1.2,
            max_drawdown: 0.25,
            min_sharpe: None,
            min_cagr: None,
            min_win_rate: None,
            max_consecutive_losses: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoreWeights {
    pub profit_factor: f64,
    pub drawdown: f64,
    pub win_rate: f64,
    pub trades: f64,
    pub sharpe: f64,
    pub cagr: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            profit_factor: 0.35,
            drawdown: 0.30,
            win_rate: 0.10,
            trades: 0.10,
            sharpe: 0.10,
            cagr: 0.05,
        }
    }
}

impl ScoreWeights {
    fn total(&self) -> f64 {
        self.profit_factor + self.drawdown + self.win_rate + self.trades + self.sharpe + self.cagr
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Grade {
    A,
    B,
    C,
    Reject,
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grade::A => write!(f, "A"),
            Grade::B => write!(f, "B"),
            Grade::C => write!(f, "C"),
            Grade::Reject => write!(f, "REJECT"),
        }
    }
}

/// The figures the evaluator looks at, extracted from a snapshot.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EvaluationMetrics {
    pub trades: usize,
    pub profit_factor: f64,
    /// Drawdown as a fraction of the peak. An undefined relative drawdown
    /// counts as 1 when any absolute drawdown exists.
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub sharpe: f64,
    pub cagr: Option<f64>,
    pub max_consecutive_losses: usize,
}

impl EvaluationMetrics {
    pub fn from_snapshot(snapshot: &MetricsSnapshot, reference_capital: Option<f64>) -> Self {
        let dd = &snapshot.drawdown;
        let max_drawdown = match dd.relative {
            Some(fraction) => fraction,
            None if dd.absolute > 0.0 => 1.0,
            None => 0.0,
        };
        Self {
            trades: snapshot.total_trades,
            profit_factor: snapshot.profit_factor,
            max_drawdown,
            win_rate: snapshot.win_rate(),
            sharpe: snapshot.sharpe,
            cagr: reference_capital.and_then(|capital| snapshot.cagr(capital)),
            max_consecutive_losses: snapshot.max_consecutive_losses,
        }
    }

    /// Metrics of a run that closed no trades.
    pub fn empty() -> Self {
        Self {
            trades: 0,
            profit_factor: 0.0,
            max_drawdown: 0.0,
            win_rate: 0.0,
            sharpe: 0.0,
            cagr: None,
            max_consecutive_losses: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EvaluationResult {
    pub passed: bool,
    pub reasons: Vec<String>,
    pub score: f64,
    pub grade: Grade,
    /// Out-of-sample factor applied to the score; 1 when not assessed.
    pub stability: f64,
    pub metrics: EvaluationMetrics,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluator {
    pub criteria: AcceptanceCriteria,
    pub weights: ScoreWeights,
    /// Lowest score still graded C.
    pub accept_threshold: f64,
    pub target_cagr: f64,
    /// Capital the CAGR-like return is measured against; no CAGR without it.
    pub reference_capital: Option<f64>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(AcceptanceCriteria::default())
    }
}

impl Evaluator {
    pub fn new(criteria: AcceptanceCriteria) -> Self {
        Self {
            criteria,
            weights: ScoreWeights::default(),
            accept_threshold: 0.0,
            target_cagr: 0.20,
            reference_capital: None,
        }
    }

    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_accept_threshold(mut self, threshold: f64) -> Self {
        self.accept_threshold = threshold;
        self
    }

    pub fn with_target_cagr(mut self, target: f64) -> Self {
        self.target_cagr = target;
        self
    }

    pub fn with_reference_capital(mut self, capital: f64) -> Self {
        self.reference_capital = Some(capital);
        self
    }

    pub fn metrics(&self, snapshot: &MetricsSnapshot) -> EvaluationMetrics {
        EvaluationMetrics::from_snapshot(snapshot, self.reference_capital)
    }

    pub fn evaluate(&self, snapshot: &MetricsSnapshot) -> EvaluationResult {
        self.evaluate_metrics(self.metrics(snapshot))
    }

    /// Evaluates a run that may have produced no trades.
    pub fn evaluate_result(&self, snapshot: Option<&MetricsSnapshot>) -> EvaluationResult {
        match snapshot {
            Some(s) => self.evaluate(s),
            None => self.evaluate_metrics(EvaluationMetrics::empty()),
        }
    }

    pub fn evaluate_metrics(&self, metrics: EvaluationMetrics) -> EvaluationResult {
        let reasons = self.check_gates(&metrics);
        let passed = reasons.is_empty();
        let score = self.score_metrics(&metrics);
        EvaluationResult {
            passed,
            reasons,
            score,
            grade: self.grade(score, passed),
            stability: 1.0,
            metrics,
        }
    }

    pub fn score_only(&self, snapshot: &MetricsSnapshot) -> f64 {
        self.score_metrics(&self.metrics(snapshot))
    }

    /// `1 - max(0, score_is - score_oos)`: only regression out of sample is
    /// penalized.
    pub fn oos_stability(&self, in_sample: &MetricsSnapshot, out_of_sample: &MetricsSnapshot) -> f64 {
        stability(self.score_only(in_sample), self.score_only(out_of_sample))
    }

    /// Evaluates the in-sample run with its score scaled by out-of-sample
    /// stability. A missing out-of-sample snapshot scores as an empty run.
    pub fn evaluate_with_oos(
        &self,
        in_sample: &MetricsSnapshot,
        out_of_sample: Option<&MetricsSnapshot>,
    ) -> EvaluationResult {
        self.evaluate_metrics_with_oos(self.metrics(in_sample), out_of_sample.map(|s| self.metrics(s)))
    }

    pub fn evaluate_metrics_with_oos(
        &self,
        in_sample: EvaluationMetrics,
        out_of_sample: Option<EvaluationMetrics>,
    ) -> EvaluationResult {
        let s_oos = self.score_metrics(&out_of_sample.unwrap_or_else(EvaluationMetrics::empty));
        let mut result = self.evaluate_metrics(in_sample);
        result.stability = stability(result.score, s_oos);
        result.score = clamp01(result.score * result.stability);
        result.grade = self.grade(result.score, result.passed);
        result
    }

    fn check_gates(&self, m: &EvaluationMetrics) -> Vec<String> {
        let c = &self.criteria;
        let mut reasons = Vec::new();
        if m.trades < c.min_trades {
            reasons.push(format!("trades {} < min_trades {}", m.trades, c.min_trades));
        }
        if !(m.profit_factor >= c.min_profit_factor) {
            reasons.push(format!(
                "profit_factor {:.3} < min_profit_factor {}",
                m.profit_factor, c.min_profit_factor
            ));
        }
        if m.max_drawdown > c.max_drawdown {
            reasons.push(format!(
                "max_drawdown {:.3} > max_drawdown {}",
                m.max_drawdown, c.max_drawdown
            ));
        }
        if let Some(min) = c.min_sharpe {
            if !(m.sharpe >= min) {
                reasons.push(format!("sharpe {:.3} < min_sharpe {min}", m.sharpe));
            }
        }
        if let Some(min) = c.min_cagr {
            match m.cagr {
                Some(cagr) if cagr >= min => {}
                Some(cagr) => reasons.push(format!("cagr {cagr:.3} < min_cagr {min}")),
                None => reasons.push(format!("cagr unavailable, min_cagr {min}")),
            }
        }
        if let Some(min) = c.min_win_rate {
            if m.win_rate < min {
                reasons.push(format!("win_rate {:.3} < min_win_rate {min}", m.win_rate));
            }
        }
        if let Some(max) = c.max_consecutive_losses {
            if m.max_consecutive_losses > max {
                reasons.push(format!(
                    "consecutive_losses {} > max_consecutive_losses {max}",
                    m.max_consecutive_losses
                ));
            }
        }
        reasons
    }

    fn score_metrics(&self, m: &EvaluationMetrics) -> f64 {
        let c = &self.criteria;
        let w = &self.weights;

        let pf_score = clamp01((m.profit_factor - 1.0) / 1.5);
        let dd_score = clamp01(1.0 - m.max_drawdown / c.max_drawdown.max(1e-9));
        let sharpe_score = clamp01(m.sharpe / 2.0);
        let cagr_score = m.cagr.map_or(0.0, |cagr| clamp01(cagr / self.target_cagr.max(1e-9)));
        let min_trades = c.min_trades as f64;
        let trades_score = clamp01((m.trades as f64 - min_trades) / min_trades.max(1.0));
        let win_rate_score = clamp01((m.win_rate - 0.5) / 0.4);

        let weighted = w.profit_factor * pf_score
            + w.drawdown * dd_score
            + w.win_rate * win_rate_score
            + w.trades * trades_score
            + w.sharpe * sharpe_score
            + w.cagr * cagr_score;
        clamp01(weighted / w.total().max(1e-9))
    }

    fn grade(&self, score: f64, passed: bool) -> Grade {
        if !passed {
            Grade::Reject
        } else if score >= 0.8 {
            Grade::A
        } else if score >= 0.6 {
            Grade::B
        } else if score >= self.accept_threshold {
            Grade::C
        } else {
            Grade::Reject
        }
    }
}

/// Gate and score `snapshot` under `criteria` with default weights.
pub fn evaluate(snapshot: &MetricsSnapshot, criteria: &AcceptanceCriteria) -> EvaluationResult {
    Evaluator::new(criteria.clone()).evaluate(snapshot)
}

fn stability(score_is: f64, score_oos: f64) -> f64 {
    clamp01(1.0 - (score_is - score_oos).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(trades: usize, pf: f64, dd: f64, win_rate: f64) -> EvaluationMetrics {
        EvaluationMetrics {
            trades,
            profit_factor: pf,
            max_drawdown: dd,
            win_rate,
            sharpe: 0.0,
            cagr: None,
            max_consecutive_losses: 0,
        }
    }

    fn criteria(min_trades: usize) -> AcceptanceCriteria {
        AcceptanceCriteria {
            min_trades,
            ..AcceptanceCriteria::default()
        }
    }

    #[test]
    fn too_few_trades_rejects_regardless_of_profit() {
        let ev = Evaluator::new(criteria(10));
        let result = ev.evaluate_metrics(metrics(3, f64::INFINITY, 0.0, 1.0));
        assert!(!result.passed);
        assert_eq!(result.grade, Grade::Reject);
        assert_eq!(result.reasons, vec!["trades 3 < min_trades 10".to_string()]);
    }

    #[test]
    fn every_violation_is_reported() {
        let ev = Evaluator::new(AcceptanceCriteria {
            min_trades: 10,
            min_profit_factor: 1.5,
            max_drawdown: 0.2,
            min_sharpe: Some(1.0),
            min_cagr: Some(0.1),
            min_win_rate: Some(0.6),
            max_consecutive_losses: Some(2),
        });
        let mut m = metrics(5, 1.0, 0.5, 0.4);
        m.max_consecutive_losses = 4;
        let result = ev.evaluate_metrics(m);
        assert_eq!(result.reasons.len(), 7);
        assert!(result.reasons[1].contains("min_profit_factor"));
        assert!(result.reasons[4].contains("cagr unavailable"));
    }

    #[test]
    fn sub_scores_are_clamped_and_weighted() {
        let ev = Evaluator::new(criteria(10));
        // pf 2.5 -> 1, dd 0 -> 1, win rate 0.9 -> 1, trades 20 -> 1
        let result = ev.evaluate_metrics(metrics(20, 2.5, 0.0, 0.9));
        assert!(result.passed);
        // sharpe and cagr contribute 0 of their 0.15
        assert!((result.score - 0.85).abs() < 1e-9);
        assert_eq!(result.grade, Grade::A);

        let huge = ev.evaluate_metrics(metrics(10_000, 1e9, 0.0, 1.0));
        assert!(huge.score <= 1.0);
    }

    #[test]
    fn grade_bands() {
        let ev = Evaluator::new(criteria(0)).with_accept_threshold(0.3);
        assert_eq!(ev.grade(0.8, true), Grade::A);
        assert_eq!(ev.grade(0.79, true), Grade::B);
        assert_eq!(ev.grade(0.6, true), Grade::B);
        assert_eq!(ev.grade(0.3, true), Grade::C);
        assert_eq!(ev.grade(0.29, true), Grade::Reject);
        assert_eq!(ev.grade(0.95, false), Grade::Reject);
        assert_eq!(Grade::Reject.to_string(), "REJECT");
    }

    #[test]
    fn empty_run_is_rejected() {
        let ev = Evaluator::new(criteria(1));
        let result = ev.evaluate_result(None);
        assert!(!result.passed);
        assert_eq!(result.metrics.trades, 0);
    }

    #[test]
    fn drawdown_fraction_scales_score() {
        let ev = Evaluator::new(criteria(0));
        let calm = ev.score_metrics(&metrics(10, 1.0, 0.0, 0.5));
        let rough = ev.score_metrics(&metrics(10, 1.0, 0.125, 0.5));
        // half the allowed drawdown costs half the drawdown weight
        assert!((calm - rough - 0.15).abs() < 1e-9);
    }

    #[test]
    fn stability_only_penalizes_regression() {
        assert_eq!(stability(0.8, 0.9), 1.0);
        assert!((stability(0.8, 0.5) - 0.7).abs() < 1e-12);
        assert_eq!(stability(1.0, 0.0), 0.0);
    }

    #[test]
    fn out_of_sample_regression_scales_score_and_regrades() {
        let ev = Evaluator::new(criteria(10)).with_accept_threshold(0.2);
        let in_sample = metrics(20, 2.5, 0.0, 0.9);
        // only the drawdown component scores: 0.30 * (1 - 0.125 / 0.25)
        let out_of_sample = metrics(10, 1.0, 0.125, 0.5);

        let plain = ev.evaluate_metrics(in_sample.clone());
        assert_eq!(plain.grade, Grade::A);

        let result = ev.evaluate_metrics_with_oos(in_sample, Some(out_of_sample));
        assert!(result.passed);
        assert!((result.stability - 0.3).abs() < 1e-9);
        assert!((result.score - 0.255).abs() < 1e-9);
        assert_eq!(result.grade, Grade::C);
    }

    #[test]
    fn matching_out_of_sample_keeps_score() {
        let ev = Evaluator::new(criteria(10));
        let m = metrics(20, 2.5, 0.0, 0.9);
        let result = ev.evaluate_metrics_with_oos(m.clone(), Some(m));
        assert_eq!(result.stability, 1.0);
        assert!((result.score - 0.85).abs() < 1e-9);
        assert_eq!(result.grade, Grade::A);
    }

    #[test]
    fn missing_out_of_sample_counts_as_empty_run() {
        let ev = Evaluator::new(criteria(10));
        let result = ev.evaluate_metrics_with_oos(metrics(20, 2.5, 0.0, 0.9), None);
        // an empty run still earns the full drawdown component
        assert!((result.stability - 0.45).abs() < 1e-9);
        assert_eq!(result.grade, Grade::C);
    }
}
