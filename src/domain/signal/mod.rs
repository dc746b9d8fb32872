//! Signals: pure per-bar directional decisions over a causal series window.
//!
//! The set of signal kinds is closed ([`SignalKind`]); configuration builds
//! them by name through [`registry`].

pub mod adx_dmi;
pub mod atr_trailing;
pub mod bollinger;
pub mod choppiness;
pub mod donchian;
pub mod heikin_ashi;
pub mod keltner_squeeze;
pub mod ma_crossover;
pub mod macd_momentum;
pub mod mtf_alignment;
pub mod registry;
pub mod rsi_reversion;
pub mod supertrend;
pub mod volume_spike;
pub mod vwap_deviation;

use std::fmt;

use crate::domain::error::TradesimError;
use crate::domain::series::{MarketSeries, SeriesWindow};

pub use adx_dmi::AdxDmi;
pub use atr_trailing::AtrTrailing;
pub use bollinger::BollingerBreach;
pub use choppiness::ChoppinessFilter;
pub use donchian::DonchianBreakout;
pub use heikin_ashi::HeikinAshiTrend;
pub use keltner_squeeze::KeltnerSqueeze;
pub use ma_crossover::MaCrossover;
pub use macd_momentum::MacdMomentum;
pub use mtf_alignment::{AlignmentMode, MtfMaAlignment};
pub use rsi_reversion::RsiReversion;
pub use supertrend::SupertrendFlip;
pub use volume_spike::VolumeSpikeExhaustion;
pub use vwap_deviation::VwapDeviation;

/// Identity of a signal inside one strategy; namespaces its indicator columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignalId(pub usize);

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Directional intent. `Neutral` means no opinion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Side {
    Long,
    Short,
    Neutral,
}

impl Side {
    /// +1 for Long, -1 for Short, 0 for Neutral.
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
            Side::Neutral => 0.0,
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
            Side::Neutral => Side::Neutral,
        }
    }

    pub fn is_neutral(self) -> bool {
        self == Side::Neutral
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
            Side::Neutral => write!(f, "none"),
        }
    }
}

/// Market regime as reported by a regime filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Regime {
    Trend,
    Range,
    Mixed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalDecision {
    pub side: Side,
    /// Confidence in `[0, 1]`; always 0 for a neutral decision.
    pub strength: f64,
    pub label: String,
}

impl SignalDecision {
    /// Builds a decision, clamping the strength into `[0, 1]`.
    pub fn new(side: Side, strength: f64, label: impl Into<String>) -> Self {
        let strength = if side.is_neutral() { 0.0 } else { clamp01(strength) };
        Self {
            side,
            strength,
            label: label.into(),
        }
    }

    pub fn neutral(label: impl Into<String>) -> Self {
        Self::new(Side::Neutral, 0.0, label)
    }

    pub fn long(strength: f64, label: impl Into<String>) -> Self {
        Self::new(Side::Long, strength, label)
    }

    pub fn short(strength: f64, label: impl Into<String>) -> Self {
        Self::new(Side::Short, strength, label)
    }

    /// `+strength` for Long, `-strength` for Short, 0 otherwise.
    pub fn signed_strength(&self) -> f64 {
        self.side.sign() * self.strength
    }
}

/// Every signal kind the engine knows about.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalKind {
    MaCrossover(MaCrossover),
    Bollinger(BollingerBreach),
    RsiReversion(RsiReversion),
    MacdMomentum(MacdMomentum),
    DonchianBreakout(DonchianBreakout),
    AdxDmi(AdxDmi),
    AtrTrailing(AtrTrailing),
    Choppiness(ChoppinessFilter),
    KeltnerSqueeze(KeltnerSqueeze),
    Supertrend(SupertrendFlip),
    VolumeSpike(VolumeSpikeExhaustion),
    HeikinAshi(HeikinAshiTrend),
    MtfMaAlignment(MtfMaAlignment),
    VwapDeviation(VwapDeviation),
}

impl SignalKind {
    /// Registered name of the kind.
    pub fn name(&self) -> &'static str {
        match self {
            SignalKind::MaCrossover(_) => ma_crossover::NAME,
            SignalKind::Bollinger(_) => bollinger::NAME,
            SignalKind::RsiReversion(_) => rsi_reversion::NAME,
            SignalKind::MacdMomentum(_) => macd_momentum::NAME,
            SignalKind::DonchianBreakout(_) => donchian::NAME,
            SignalKind::AdxDmi(_) => adx_dmi::NAME,
            SignalKind::AtrTrailing(_) => atr_trailing::NAME,
            SignalKind::Choppiness(_) => choppiness::NAME,
            SignalKind::KeltnerSqueeze(_) => keltner_squeeze::NAME,
            SignalKind::Supertrend(_) => supertrend::NAME,
            SignalKind::VolumeSpike(_) => volume_spike::NAME,
            SignalKind::HeikinAshi(_) => heikin_ashi::NAME,
            SignalKind::MtfMaAlignment(_) => mtf_alignment::NAME,
            SignalKind::VwapDeviation(_) => vwap_deviation::NAME,
        }
    }

    /// Writes this signal's derived columns under `id`.
    pub fn compute_indicators(
        &self,
        id: SignalId,
        series: &mut MarketSeries,
    ) -> Result<(), TradesimError> {
        match self {
            SignalKind::MaCrossover(s) => s.compute_indicators(id, series),
            SignalKind::Bollinger(s) => s.compute_indicators(id, series),
            SignalKind::RsiReversion(s) => s.compute_indicators(id, series),
            SignalKind::MacdMomentum(s) => s.compute_indicators(id, series),
            SignalKind::DonchianBreakout(s) => s.compute_indicators(id, series),
            SignalKind::AdxDmi(s) => s.compute_indicators(id, series),
            SignalKind::AtrTrailing(s) => s.compute_indicators(id, series),
            SignalKind::Choppiness(s) => s.compute_indicators(id, series),
            SignalKind::KeltnerSqueeze(s) => s.compute_indicators(id, series),
            SignalKind::Supertrend(s) => s.compute_indicators(id, series),
            SignalKind::VolumeSpike(s) => s.compute_indicators(id, series),
            SignalKind::HeikinAshi(s) => s.compute_indicators(id, series),
            SignalKind::MtfMaAlignment(s) => s.compute_indicators(id, series),
            SignalKind::VwapDeviation(s) => s.compute_indicators(id, series),
        }
    }

    /// Regime read by this signal at the window's current bar. Only regime
    /// filters report one.
    pub fn regime(&self, id: SignalId, window: &SeriesWindow<'_>) -> Option<Regime> {
        match self {
            SignalKind::Choppiness(s) => s.regime(id, window),
            _ => None,
        }
    }

    /// Decision at the window's current bar. Total: warmup yields neutral.
    pub fn generate(&self, id: SignalId, window: &SeriesWindow<'_>, label: &str) -> SignalDecision {
        match self {
            SignalKind::MaCrossover(s) => s.generate(id, window, label),
            SignalKind::Bollinger(s) => s.generate(id, window, label),
            SignalKind::RsiReversion(s) => s.generate(id, window, label),
            SignalKind::MacdMomentum(s) => s.generate(id, window, label),
            SignalKind::DonchianBreakout(s) => s.generate(id, window, label),
            SignalKind::AdxDmi(s) => s.generate(id, window, label),
            SignalKind::AtrTrailing(s) => s.generate(id, window, label),
            SignalKind::Choppiness(s) => s.generate(id, window, label),
            SignalKind::KeltnerSqueeze(s) => s.generate(id, window, label),
            SignalKind::Supertrend(s) => s.generate(id, window, label),
            SignalKind::VolumeSpike(s) => s.generate(id, window, label),
            SignalKind::HeikinAshi(s) => s.generate(id, window, label),
            SignalKind::MtfMaAlignment(s) => s.generate(id, window, label),
            SignalKind::VwapDeviation(s) => s.generate(id, window, label),
        }
    }
}

pub fn clamp01(x: f64) -> f64 {
    if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) }
}

/// `prev <= level < cur`
pub fn cross_up(prev: f64, cur: f64, level: f64) -> bool {
    prev <= level && cur > level
}

/// `prev >= level > cur`
pub fn cross_down(prev: f64, cur: f64, level: f64) -> bool {
    prev >= level && cur < level
}

/// Distance in ATR units, clamped to `[0, 1]`. A missing or zero ATR
/// saturates any non-zero distance.
pub fn norm_by_atr(distance: f64, atr: Option<f64>) -> f64 {
    match atr {
        Some(a) if a > 0.0 => clamp01(distance.abs() / a),
        _ => clamp01(distance.abs() / 1e-9),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_strength_is_clamped() {
        assert!((SignalDecision::long(1.7, "x").strength - 1.0).abs() < f64::EPSILON);
        assert!(SignalDecision::short(-0.3, "x").strength.abs() < f64::EPSILON);
        assert!(SignalDecision::long(f64::NAN, "x").strength.abs() < f64::EPSILON);
    }

    #[test]
    fn neutral_decision_has_zero_strength() {
        let d = SignalDecision::new(Side::Neutral, 0.8, "x");
        assert_eq!(d.side, Side::Neutral);
        assert!(d.strength.abs() < f64::EPSILON);
    }

    #[test]
    fn signed_strength_follows_side() {
        assert!((SignalDecision::long(0.4, "a").signed_strength() - 0.4).abs() < 1e-12);
        assert!((SignalDecision::short(0.4, "a").signed_strength() + 0.4).abs() < 1e-12);
        assert!(SignalDecision::neutral("a").signed_strength().abs() < f64::EPSILON);
    }

    #[test]
    fn side_helpers() {
        assert_eq!(Side::Long.opposite(), Side::Short);
        assert_eq!(Side::Neutral.opposite(), Side::Neutral);
        assert_eq!(Side::Short.to_string(), "short");
        assert_eq!(Side::Neutral.to_string(), "none");
    }

    #[test]
    fn crosses() {
        assert!(cross_up(29.0, 31.0, 30.0));
        assert!(cross_up(30.0, 31.0, 30.0));
        assert!(!cross_up(31.0, 32.0, 30.0));
        assert!(cross_down(71.0, 69.0, 70.0));
        assert!(!cross_down(69.0, 68.0, 70.0));
    }

    #[test]
    fn atr_normalisation() {
        assert!((norm_by_atr(1.0, Some(2.0)) - 0.5).abs() < 1e-12);
        assert!((norm_by_atr(-3.0, Some(2.0)) - 1.0).abs() < 1e-12);
        assert!((norm_by_atr(0.5, None) - 1.0).abs() < 1e-12);
        assert!(norm_by_atr(0.0, Some(0.0)).abs() < 1e-12);
    }
}
