//! Configuration validation.
//!
//! Checks the `[backtest]`, `[strategy]`, `[signal.<id>]` and `[evaluation]`
//! sections before anything is built from them. Each function returns the
//! first problem found.

use crate::domain::backtest::parse_time_of_day;
use crate::domain::error::TradesimError;
use crate::domain::signal::registry;
use crate::domain::strategy::presets::{lookup_preset, PRESETS};
use crate::ports::config_port::ConfigPort;

pub const COMBINERS: &[&str] = &["weighted_vote", "thresholded", "gated", "agreement"];
pub const ROLES: &[&str] = &["entry", "filter"];

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    validate_point_value(config)?;
    validate_cost_per_trade(config)?;
    validate_time_limits(config)?;
    validate_max_trade_day(config)?;
    validate_integrity(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    validate_combiner(config)?;
    validate_amount(config)?;
    if let Some(preset) = config.get_string("strategy", "preset") {
        return validate_preset(config, &preset);
    }
    for id in signal_ids(config)? {
        validate_signal_section(config, &id)?;
    }
    Ok(())
}

pub fn validate_evaluation_config(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    let section = "evaluation";
    if config.get_int(section, "min_trades", 0) < 0 {
        return Err(TradesimError::invalid(section, "min_trades", "min_trades must be non-negative"));
    }
    if config.get_int(section, "max_consecutive_losses", 0) < 0 {
        return Err(TradesimError::invalid(
            section,
            "max_consecutive_losses",
            "max_consecutive_losses must be non-negative",
        ));
    }
    let max_dd = config.get_double(section, "max_drawdown", 0.25);
    if !(max_dd > 0.0) {
        return Err(TradesimError::invalid(section, "max_drawdown", "max_drawdown must be positive"));
    }
    let win_rate = config.get_double(section, "min_win_rate", 0.0);
    if !(0.0..=1.0).contains(&win_rate) {
        return Err(TradesimError::invalid(
            section,
            "min_win_rate",
            "min_win_rate must be between 0 and 1",
        ));
    }
    let threshold = config.get_double(section, "accept_threshold", 0.0);
    if !(0.0..=1.0).contains(&threshold) {
        return Err(TradesimError::invalid(
            section,
            "accept_threshold",
            "accept_threshold must be between 0 and 1",
        ));
    }
    if config.get_double(section, "reference_capital", 1.0) <= 0.0 {
        return Err(TradesimError::invalid(
            section,
            "reference_capital",
            "reference_capital must be positive",
        ));
    }
    if config.get_double(section, "target_cagr", 0.20) <= 0.0 {
        return Err(TradesimError::invalid(section, "target_cagr", "target_cagr must be positive"));
    }
    Ok(())
}

/// Ids listed in `[strategy] signals`, in order.
pub fn signal_ids(config: &dyn ConfigPort) -> Result<Vec<String>, TradesimError> {
    let raw = config
        .get_string("strategy", "signals")
        .ok_or_else(|| TradesimError::missing("strategy", "signals"))?;
    let ids: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if ids.is_empty() {
        return Err(TradesimError::missing("strategy", "signals"));
    }
    for (i, id) in ids.iter().enumerate() {
        if ids[..i].contains(id) {
            return Err(TradesimError::invalid(
                "strategy",
                "signals",
                format!("signal '{id}' listed twice"),
            ));
        }
    }
    Ok(ids)
}

/// Config section holding a signal's parameters.
pub fn signal_section(id: &str) -> String {
    format!("signal.{id}")
}

fn validate_point_value(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    let value = config.get_double("backtest", "point_value", 1.0);
    if !(value > 0.0) {
        return Err(TradesimError::invalid("backtest", "point_value", "point_value must be positive"));
    }
    Ok(())
}

fn validate_cost_per_trade(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    let value = config.get_double("backtest", "cost_per_trade", 0.0);
    if value < 0.0 {
        return Err(TradesimError::invalid(
            "backtest",
            "cost_per_trade",
            "cost_per_trade must be non-negative",
        ));
    }
    Ok(())
}

fn validate_time_limits(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    let mut parsed = Vec::new();
    for key in ["entry_time_limit", "exit_time_limit"] {
        let time = match config.get_string("backtest", key) {
            Some(raw) if !raw.trim().is_empty() => Some(parse_time_of_day(&raw).ok_or_else(|| {
                TradesimError::invalid("backtest", key, format!("invalid time '{raw}', expected HH:MM"))
            })?),
            _ => None,
        };
        parsed.push(time);
    }
    if let (Some(entry), Some(exit)) = (parsed[0], parsed[1]) {
        if entry > exit {
            return Err(TradesimError::invalid(
                "backtest",
                "entry_time_limit",
                "entry_time_limit must not be later than exit_time_limit",
            ));
        }
    }
    Ok(())
}

fn validate_max_trade_day(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    if config.get_int("backtest", "max_trade_day", 0) < 0 {
        return Err(TradesimError::invalid(
            "backtest",
            "max_trade_day",
            "max_trade_day must be non-negative",
        ));
    }
    Ok(())
}

fn validate_integrity(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    if config.get_int("backtest", "max_invalid_bars", 0) < 0 {
        return Err(TradesimError::invalid(
            "backtest",
            "max_invalid_bars",
            "max_invalid_bars must be non-negative",
        ));
    }
    if config.get_string("backtest", "max_gap_minutes").is_some()
        && config.get_int("backtest", "max_gap_minutes", 0) <= 0
    {
        return Err(TradesimError::invalid(
            "backtest",
            "max_gap_minutes",
            "max_gap_minutes must be a positive whole number",
        ));
    }
    Ok(())
}

fn validate_combiner(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    let name = config
        .get_string("strategy", "combiner")
        .unwrap_or_else(|| "weighted_vote".to_string());
    let name = name.trim().to_lowercase();
    if !COMBINERS.contains(&name.as_str()) {
        return Err(TradesimError::invalid(
            "strategy",
            "combiner",
            format!("unknown combiner '{name}', expected one of {}", COMBINERS.join(", ")),
        ));
    }
    if name == "thresholded" && config.get_double("strategy", "threshold", 0.0) < 0.0 {
        return Err(TradesimError::invalid("strategy", "threshold", "threshold must be non-negative"));
    }
    Ok(())
}

fn validate_preset(config: &dyn ConfigPort, preset: &str) -> Result<(), TradesimError> {
    if config.get_string("strategy", "signals").is_some() {
        return Err(TradesimError::invalid(
            "strategy",
            "preset",
            "preset and signals are mutually exclusive",
        ));
    }
    if lookup_preset(preset).is_none() {
        let known: Vec<&str> = PRESETS.iter().map(|p| p.name).collect();
        return Err(TradesimError::invalid(
            "strategy",
            "preset",
            format!("unknown preset '{}', expected one of {}", preset.trim(), known.join(", ")),
        ));
    }
    Ok(())
}

fn validate_amount(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    let amount = config.get_double("strategy", "amount", 1.0);
    if !(amount > 0.0) {
        return Err(TradesimError::invalid("strategy", "amount", "amount must be positive"));
    }
    Ok(())
}

fn validate_signal_section(config: &dyn ConfigPort, id: &str) -> Result<(), TradesimError> {
    let section = signal_section(id);
    let kind = config
        .get_string(&section, "kind")
        .ok_or_else(|| TradesimError::missing(&section, "kind"))?;
    registry::build_signal(&kind, config, &section)?;

    if let Some(role) = config.get_string(&section, "role") {
        let role = role.trim().to_lowercase();
        if !ROLES.contains(&role.as_str()) {
            return Err(TradesimError::invalid(
                &section,
                "role",
                format!("unknown role '{role}', expected entry or filter"),
            ));
        }
    }
    if config.get_double(&section, "weight", 1.0) < 0.0 {
        return Err(TradesimError::invalid(&section, "weight", "weight must be non-negative"));
    }
    Ok(())
}
