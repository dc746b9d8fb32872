//! Trade orders and the decision breakdown attached to them.

use std::fmt;

use chrono::NaiveDateTime;

use crate::domain::signal::{Side, SignalDecision};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OrderKind {
    Buy,
    Sell,
    Close,
    /// Close the open position and open the opposite one at the same fill.
    Invert,
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderKind::Buy => write!(f, "buy"),
            OrderKind::Sell => write!(f, "sell"),
            OrderKind::Close => write!(f, "close"),
            OrderKind::Invert => write!(f, "invert"),
        }
    }
}

/// One signal's contribution to an order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecisionRecord {
    pub label: String,
    pub side: Side,
    pub strength: f64,
}

impl From<&SignalDecision> for DecisionRecord {
    fn from(d: &SignalDecision) -> Self {
        Self {
            label: d.label.clone(),
            side: d.side,
            strength: d.strength,
        }
    }
}

/// Ordered per-signal breakdown behind an order, in strategy signal order.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecisionInfo {
    pub decisions: Vec<DecisionRecord>,
}

impl DecisionInfo {
    pub fn from_decisions(decisions: &[SignalDecision]) -> Self {
        Self {
            decisions: decisions.iter().map(DecisionRecord::from).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TradeOrder {
    pub kind: OrderKind,
    pub price: f64,
    pub timestamp: NaiveDateTime,
    pub amount: f64,
    /// Price slippage per unit, charged through `point_value`.
    pub slippage: Option<f64>,
    pub comment: Option<String>,
    pub info: Option<DecisionInfo>,
}

impl TradeOrder {
    pub fn new(kind: OrderKind, price: f64, timestamp: NaiveDateTime) -> Self {
        Self {
            kind,
            price,
            timestamp,
            amount: 1.0,
            slippage: None,
            comment: None,
            info: None,
        }
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_slippage(mut self, slippage: f64) -> Self {
        self.slippage = Some(slippage);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_info(mut self, info: DecisionInfo) -> Self {
        self.info = Some(info);
        self
    }
}
