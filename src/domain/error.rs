//! Domain error types.

use std::fmt;

use crate::domain::order::OrderKind;
use crate::domain::position::Direction;
use crate::domain::trade_registry::TradeRegistry;

/// Position state of a registry at the moment an order arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    Flat,
    Open(Direction),
}

impl fmt::Display for RegistryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryState::Flat => write!(f, "flat"),
            RegistryState::Open(direction) => write!(f, "open {direction}"),
        }
    }
}

/// An order the trade registry refused to apply.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransitionError {
    #[error("invalid transition: {order} order while {state}")]
    InvalidTransition {
        order: OrderKind,
        state: RegistryState,
    },

    #[error("invalid {order} order: {reason}")]
    InvalidOrder { order: OrderKind, reason: String },
}

/// A simulation that stopped on a rejected order.
///
/// `partial` holds every trade committed before the failure and is marked
/// truncated.
#[derive(Debug)]
pub struct RunAborted {
    pub bar_index: usize,
    pub last_valid_bar: Option<usize>,
    pub reason: TransitionError,
    pub partial: TradeRegistry,
}

impl fmt::Display for RunAborted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run aborted at bar {}: {}", self.bar_index, self.reason)?;
        match self.last_valid_bar {
            Some(bar) => write!(f, " (last valid bar {bar})"),
            None => write!(f, " (no bar completed)"),
        }
    }
}

/// Top-level error type for tradesim.
#[derive(Debug, thiserror::Error)]
pub enum TradesimError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("unknown signal kind '{name}'")]
    UnknownSignal { name: String },

    #[error("indicator column {column} for signal {signal} already written")]
    IndicatorConflict { signal: usize, column: String },

    #[error("data integrity error at bar {index}: {reason}")]
    DataIntegrity { index: usize, reason: String },

    #[error("insufficient data: have {bars} bars, need {minimum}")]
    InsufficientData { bars: usize, minimum: usize },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("{0}")]
    RunAborted(Box<RunAborted>),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TradesimError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        TradesimError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(section: &str, key: &str) -> Self {
        TradesimError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }
}

impl From<&TradesimError> for std::process::ExitCode {
    fn from(err: &TradesimError) -> Self {
        let code: u8 = match err {
            TradesimError::Io(_) => 1,
            TradesimError::ConfigParse { .. }
            | TradesimError::ConfigMissing { .. }
            | TradesimError::ConfigInvalid { .. } => 2,
            TradesimError::UnknownSignal { .. } | TradesimError::IndicatorConflict { .. } => 4,
            TradesimError::DataIntegrity { .. }
            | TradesimError::InsufficientData { .. }
            | TradesimError::Data { .. } => 5,
            TradesimError::RunAborted(_) => 6,
        };
        std::process::ExitCode::from(code)
    }
}
