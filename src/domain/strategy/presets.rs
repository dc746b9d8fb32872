//! Ready-made strategies.
//!
//! Each preset fixes its signals, their parameters and the combiner. Select
//! one with `[strategy] preset = <name>`.

use crate::domain::combiner::Combiner;
use crate::domain::signal::{
    AdxDmi, AlignmentMode, AtrTrailing, BollingerBreach, ChoppinessFilter, DonchianBreakout,
    KeltnerSqueeze, MtfMaAlignment, RsiReversion, SignalKind, SupertrendFlip,
    VolumeSpikeExhaustion,
};
use crate::domain::strategy::{CompositeStrategy, StrategySignal};

pub const MOMENTUM_RIDER: &str = "momentum_rider";
pub const RANGE_FADER: &str = "range_fader";
pub const VOLATILITY_BREAKOUT: &str = "volatility_breakout";

pub struct Preset {
    pub name: &'static str,
    pub summary: &'static str,
    build: fn() -> CompositeStrategy,
}

impl Preset {
    pub fn build(&self) -> CompositeStrategy {
        (self.build)()
    }
}

pub const PRESETS: &[Preset] = &[
    Preset {
        name: MOMENTUM_RIDER,
        summary: "trend following: MA alignment, ADX, Supertrend flips, ATR trail; stop and reverse",
        build: momentum_rider,
    },
    Preset {
        name: RANGE_FADER,
        summary: "mean reversion in choppy markets: RSI and Bollinger must agree",
        build: range_fader,
    },
    Preset {
        name: VOLATILITY_BREAKOUT,
        summary: "squeeze breakouts confirmed by Donchian and volume, ATR trail",
        build: volatility_breakout,
    },
];

pub fn lookup_preset(name: &str) -> Option<&'static Preset> {
    let name = name.trim();
    PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

pub fn momentum_rider() -> CompositeStrategy {
    let alignment = MtfMaAlignment::new(50, 20, AlignmentMode::HtOnly);
    CompositeStrategy::new(
        MOMENTUM_RIDER,
        vec![
            StrategySignal::entry("alignment", SignalKind::MtfMaAlignment(alignment)),
            StrategySignal::entry("adx", SignalKind::AdxDmi(AdxDmi::new(14, 25.0))),
            StrategySignal::entry("supertrend", SignalKind::Supertrend(SupertrendFlip::new(10, 3.0))),
            StrategySignal::entry("trail", SignalKind::AtrTrailing(AtrTrailing::new(14, 3.0))),
        ],
    )
    .with_always_active(true)
}

pub fn range_fader() -> CompositeStrategy {
    let rsi = RsiReversion {
        smoothing: Some(5),
        ..RsiReversion::new(14, 30.0, 70.0)
    };
    CompositeStrategy::new(
        RANGE_FADER,
        vec![
            StrategySignal::filter("regime", SignalKind::Choppiness(ChoppinessFilter::default())),
            StrategySignal::entry("rsi", SignalKind::RsiReversion(rsi)),
            StrategySignal::entry("bands", SignalKind::Bollinger(BollingerBreach::new(20, 2.0))),
        ],
    )
    .with_combiner(Combiner::Agreement)
}

pub fn volatility_breakout() -> CompositeStrategy {
    CompositeStrategy::new(
        VOLATILITY_BREAKOUT,
        vec![
            StrategySignal::entry("squeeze", SignalKind::KeltnerSqueeze(KeltnerSqueeze::default())),
            StrategySignal::entry(
                "donchian",
                SignalKind::DonchianBreakout(DonchianBreakout::new(20, 5)),
            ),
            StrategySignal::entry(
                "volume",
                SignalKind::VolumeSpike(VolumeSpikeExhaustion::default()),
            ),
            StrategySignal::entry("trail", SignalKind::AtrTrailing(AtrTrailing::new(14, 3.0))),
        ],
    )
}
