//! Open positions and closed trade records.

use std::fmt;

use chrono::NaiveDateTime;

use crate::domain::order::DecisionInfo;
use crate::domain::signal::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }

    pub fn side(self) -> Side {
        match self {
            Direction::Long => Side::Long,
            Direction::Short => Side::Short,
        }
    }

    /// The direction a non-neutral side opens.
    pub fn from_side(side: Side) -> Option<Direction> {
        match side {
            Side::Long => Some(Direction::Long),
            Side::Short => Some(Direction::Short),
            Side::Neutral => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

/// The registry's single open position.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub direction: Direction,
    pub entry_price: f64,
    pub entry_time: NaiveDateTime,
    pub amount: f64,
    pub entry_slippage: f64,
    pub entry_info: Option<DecisionInfo>,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.direction == Direction::Long
    }

    pub fn is_short(&self) -> bool {
        self.direction == Direction::Short
    }

    /// Mark-to-market result in currency, before costs.
    pub fn unrealized_pnl(&self, price: f64, point_value: f64) -> f64 {
        (price - self.entry_price) * self.direction.sign() * point_value * self.amount
    }
}

/// Day trades open and close on the same calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TaxClass {
    DayTrade,
    SwingTrade,
}

impl TaxClass {
    pub fn classify(entry: NaiveDateTime, exit: NaiveDateTime) -> TaxClass {
        if entry.date() == exit.date() {
            TaxClass::DayTrade
        } else {
            TaxClass::SwingTrade
        }
    }
}

impl fmt::Display for TaxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaxClass::DayTrade => write!(f, "day"),
            TaxClass::SwingTrade => write!(f, "swing"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClosedTrade {
    pub direction: Direction,
    pub entry_price: f64,
    pub entry_time: NaiveDateTime,
    pub exit_price: f64,
    pub exit_time: NaiveDateTime,
    pub amount: f64,
    pub gross_pnl: f64,
    pub costs: f64,
    pub tax: f64,
    pub net_pnl: f64,
    pub entry_info: Option<DecisionInfo>,
    pub exit_info: Option<DecisionInfo>,
    pub comment: Option<String>,
}

impl ClosedTrade {
    pub fn tax_class(&self) -> TaxClass {
        TaxClass::classify(self.entry_time, self.exit_time)
    }

    /// Result after costs, before tax.
    pub fn pre_tax(&self) -> f64 {
        self.gross_pnl - self.costs
    }

    pub fn is_winner(&self) -> bool {
        self.net_pnl > 0.0
    }

    pub fn holding_days(&self) -> i64 {
        (self.exit_time.date() - self.entry_time.date()).num_days()
    }
}
