//! Name → constructor table for signal kinds.
//!
//! Each entry reads its parameters from one config section (for example
//! `[signal.fast_cross]`), falling back to the kind's defaults.

use crate::domain::error::TradesimError;
use crate::domain::indicator::MaKind;
use crate::domain::signal::{
    adx_dmi, atr_trailing, bollinger, choppiness, donchian, heikin_ashi, keltner_squeeze,
    ma_crossover, macd_momentum, mtf_alignment, rsi_reversion, supertrend, volume_spike,
    vwap_deviation, AdxDmi, AtrTrailing, BollingerBreach, ChoppinessFilter, DonchianBreakout,
    HeikinAshiTrend, KeltnerSqueeze, MaCrossover, MacdMomentum, MtfMaAlignment, RsiReversion,
    SignalKind, SupertrendFlip, VolumeSpikeExhaustion, VwapDeviation,
};
use crate::ports::config_port::ConfigPort;

type BuildFn = fn(&dyn ConfigPort, &str) -> Result<SignalKind, TradesimError>;

pub struct SignalEntry {
    pub name: &'static str,
    pub summary: &'static str,
    build: BuildFn,
}

impl SignalEntry {
    pub fn build(&self, config: &dyn ConfigPort, section: &str) -> Result<SignalKind, TradesimError> {
        (self.build)(config, section)
    }
}

pub const REGISTERED_SIGNALS: &[SignalEntry] = &[
    SignalEntry {
        name: ma_crossover::NAME,
        summary: "short/long moving average crossover beyond a tick threshold",
        build: build_ma_crossover,
    },
    SignalEntry {
        name: bollinger::NAME,
        summary: "close outside the Bollinger bands, strength by band width",
        build: build_bollinger,
    },
    SignalEntry {
        name: rsi_reversion::NAME,
        summary: "RSI re-entering its bands from outside",
        build: build_rsi_reversion,
    },
    SignalEntry {
        name: macd_momentum::NAME,
        summary: "MACD above/below signal with optional zero-line bias",
        build: build_macd_momentum,
    },
    SignalEntry {
        name: donchian::NAME,
        summary: "prior Donchian channel breakout with pullback confirmation",
        build: build_donchian,
    },
    SignalEntry {
        name: adx_dmi::NAME,
        summary: "DI spread gated by an ADX trend-strength threshold",
        build: build_adx_dmi,
    },
    SignalEntry {
        name: atr_trailing::NAME,
        summary: "close crossing a chandelier ATR trail",
        build: build_atr_trailing,
    },
    SignalEntry {
        name: choppiness::NAME,
        summary: "choppiness regime filter with optional baseline bias",
        build: build_choppiness,
    },
    SignalEntry {
        name: keltner_squeeze::NAME,
        summary: "close leaving the Keltner channel after a Bollinger squeeze",
        build: build_keltner_squeeze,
    },
    SignalEntry {
        name: supertrend::NAME,
        summary: "Supertrend direction flip",
        build: build_supertrend,
    },
    SignalEntry {
        name: volume_spike::NAME,
        summary: "volume and range climax closing at an extreme, faded",
        build: build_volume_spike,
    },
    SignalEntry {
        name: heikin_ashi::NAME,
        summary: "run of full-bodied Heikin-Ashi candles",
        build: build_heikin_ashi,
    },
    SignalEntry {
        name: mtf_alignment::NAME,
        summary: "close against a slow EMA, optionally confirmed by a fast one",
        build: build_mtf_alignment,
    },
    SignalEntry {
        name: vwap_deviation::NAME,
        summary: "deviation from session VWAP snapping back inside its band",
        build: build_vwap_deviation,
    },
];

pub fn lookup(name: &str) -> Option<&'static SignalEntry> {
    let name = name.trim();
    REGISTERED_SIGNALS
        .iter()
        .find(|e| e.name.eq_ignore_ascii_case(name))
}

/// Builds the signal registered under `name` from `[section]`.
pub fn build_signal(
    name: &str,
    config: &dyn ConfigPort,
    section: &str,
) -> Result<SignalKind, TradesimError> {
    let entry = lookup(name).ok_or_else(|| TradesimError::UnknownSignal {
        name: name.to_string(),
    })?;
    entry.build(config, section)
}

fn build_ma_crossover(c: &dyn ConfigPort, s: &str) -> Result<SignalKind, TradesimError> {
    MaCrossover::from_config(c, s).map(SignalKind::MaCrossover)
}

fn build_bollinger(c: &dyn ConfigPort, s: &str) -> Result<SignalKind, TradesimError> {
    BollingerBreach::from_config(c, s).map(SignalKind::Bollinger)
}

fn build_rsi_reversion(c: &dyn ConfigPort, s: &str) -> Result<SignalKind, TradesimError> {
    RsiReversion::from_config(c, s).map(SignalKind::RsiReversion)
}

fn build_macd_momentum(c: &dyn ConfigPort, s: &str) -> Result<SignalKind, TradesimError> {
    MacdMomentum::from_config(c, s).map(SignalKind::MacdMomentum)
}

fn build_donchian(c: &dyn ConfigPort, s: &str) -> Result<SignalKind, TradesimError> {
    DonchianBreakout::from_config(c, s).map(SignalKind::DonchianBreakout)
}

fn build_adx_dmi(c: &dyn ConfigPort, s: &str) -> Result<SignalKind, TradesimError> {
    AdxDmi::from_config(c, s).map(SignalKind::AdxDmi)
}

fn build_atr_trailing(c: &dyn ConfigPort, s: &str) -> Result<SignalKind, TradesimError> {
    AtrTrailing::from_config(c, s).map(SignalKind::AtrTrailing)
}

fn build_choppiness(c: &dyn ConfigPort, s: &str) -> Result<SignalKind, TradesimError> {
    ChoppinessFilter::from_config(c, s).map(SignalKind::Choppiness)
}

fn build_keltner_squeeze(c: &dyn ConfigPort, s: &str) -> Result<SignalKind, TradesimError> {
    KeltnerSqueeze::from_config(c, s).map(SignalKind::KeltnerSqueeze)
}

fn build_supertrend(c: &dyn ConfigPort, s: &str) -> Result<SignalKind, TradesimError> {
    SupertrendFlip::from_config(c, s).map(SignalKind::Supertrend)
}

fn build_volume_spike(c: &dyn ConfigPort, s: &str) -> Result<SignalKind, TradesimError> {
    VolumeSpikeExhaustion::from_config(c, s).map(SignalKind::VolumeSpike)
}

fn build_heikin_ashi(c: &dyn ConfigPort, s: &str) -> Result<SignalKind, TradesimError> {
    HeikinAshiTrend::from_config(c, s).map(SignalKind::HeikinAshi)
}

fn build_mtf_alignment(c: &dyn ConfigPort, s: &str) -> Result<SignalKind, TradesimError> {
    MtfMaAlignment::from_config(c, s).map(SignalKind::MtfMaAlignment)
}

fn build_vwap_deviation(c: &dyn ConfigPort, s: &str) -> Result<SignalKind, TradesimError> {
    VwapDeviation::from_config(c, s).map(SignalKind::VwapDeviation)
}

pub(crate) fn read_period(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, TradesimError> {
    let value = config.get_int(section, key, default as i64);
    if value < 1 {
        return Err(TradesimError::invalid(section, key, format!("{key} must be at least 1")));
    }
    Ok(value as usize)
}

pub(crate) fn read_non_negative(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, TradesimError> {
    let value = config.get_double(section, key, default);
    if !value.is_finite() || value < 0.0 {
        return Err(TradesimError::invalid(section, key, format!("{key} must be non-negative")));
    }
    Ok(value)
}

pub(crate) fn read_positive(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, TradesimError> {
    let value = config.get_double(section, key, default);
    if !value.is_finite() || value <= 0.0 {
        return Err(TradesimError::invalid(section, key, format!("{key} must be positive")));
    }
    Ok(value)
}

pub(crate) fn read_ma_kind(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: MaKind,
) -> Result<MaKind, TradesimError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|reason: String| TradesimError::invalid(section, key, reason)),
    }
}
