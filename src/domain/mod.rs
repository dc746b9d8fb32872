//! Core domain types and logic.

pub mod ohlcv;
pub mod series;
pub mod indicator;
pub mod indicator_helpers;
pub mod signal;
pub mod combiner;
pub mod strategy;
pub mod order;
pub mod position;
pub mod tax;
pub mod trade_registry;
pub mod backtest;
pub mod metrics;
pub mod evaluation;
pub mod config_validation;
pub mod error;
