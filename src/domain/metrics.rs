//! Performance metrics over a closed-trade sequence.

use chrono::{NaiveDate, NaiveDateTime};

use super::position::{ClosedTrade, TaxClass};
use super::tax::month_key;

const MONTHS_PER_YEAR: f64 = 12.0;
const DAYS_PER_YEAR: f64 = 365.25;

/// Peak-to-trough decline of cumulative net equity, which starts at 0.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Drawdown {
    pub absolute: f64,
    /// `absolute / peak` at the deepest trough, when that peak is positive.
    pub relative: Option<f64>,
    /// `absolute / final balance`, when the final balance is positive.
    pub relative_to_final: Option<f64>,
}

/// One calendar month of closed trades, keyed by exit month.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MonthlyResult {
    pub month: NaiveDate,
    pub trades: usize,
    pub gross: f64,
    pub costs: f64,
    pub tax: f64,
    pub net: f64,
    /// Cumulative net through this month.
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricsSnapshot {
    pub total_trades: usize,
    pub positive_trades: usize,
    pub negative_trades: usize,
    pub day_trades: usize,
    pub swing_trades: usize,
    pub gross_balance: f64,
    pub net_balance: f64,
    pub total_cost: f64,
    pub total_tax: f64,
    /// Sum of winning net results.
    pub total_profit: f64,
    /// Sum of losing net results (non-positive).
    pub total_loss: f64,
    /// `f64::INFINITY` when there are wins and no losses.
    pub profit_factor: f64,
    pub accuracy: f64,
    pub mean_win: f64,
    /// Mean losing result as a positive magnitude.
    pub mean_loss: f64,
    pub mean_win_loss_ratio: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub result_std: f64,
    pub drawdown: Drawdown,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
    pub monthly: Vec<MonthlyResult>,
    pub average_monthly_result: f64,
    /// Annualized mean/std of monthly net results; 0 when undefined.
    pub sharpe: f64,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_days: i64,
    pub avg_trade_duration: f64,
}

impl MetricsSnapshot {
    /// `None` for an empty trade list.
    pub fn compute(trades: &[ClosedTrade]) -> Option<Self> {
        let first = trades.first()?;
        let start = trades.iter().map(|t| t.entry_time).min().unwrap_or(first.entry_time);
        let end = trades.iter().map(|t| t.exit_time).max().unwrap_or(first.exit_time);

        let mut positive_trades = 0usize;
        let mut negative_trades = 0usize;
        let mut day_trades = 0usize;
        let mut total_profit = 0.0_f64;
        let mut total_loss = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut gross_balance = 0.0_f64;
        let mut total_cost = 0.0_f64;
        let mut total_tax = 0.0_f64;
        let mut total_duration_days = 0i64;

        for trade in trades {
            let pnl = trade.net_pnl;
            if pnl > 0.0 {
                positive_trades += 1;
                total_profit += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < 0.0 {
                negative_trades += 1;
                total_loss += pnl;
                largest_loss = largest_loss.max(pnl.abs());
            }
            if trade.tax_class() == TaxClass::DayTrade {
                day_trades += 1;
            }
            gross_balance += trade.gross_pnl;
            total_cost += trade.costs;
            total_tax += trade.tax;
            total_duration_days += trade.holding_days();
        }

        let total_trades = trades.len();
        let net_balance = total_profit + total_loss;

        let profit_factor = if total_loss < 0.0 {
            total_profit / total_loss.abs()
        } else if total_profit > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let mean_win = if positive_trades > 0 {
            total_profit / positive_trades as f64
        } else {
            0.0
        };
        let mean_loss = if negative_trades > 0 {
            total_loss.abs() / negative_trades as f64
        } else {
            0.0
        };
        let mean_win_loss_ratio = if mean_loss > 0.0 {
            mean_win / mean_loss
        } else {
            0.0
        };

        let results: Vec<f64> = trades.iter().map(|t| t.net_pnl).collect();
        let (max_consecutive_wins, max_consecutive_losses) = compute_streaks(&results);
        let monthly = compute_monthly(trades);
        let monthly_nets: Vec<f64> = monthly.iter().map(|m| m.net).collect();
        let average_monthly_result = mean(&monthly_nets);

        Some(MetricsSnapshot {
            total_trades,
            positive_trades,
            negative_trades,
            day_trades,
            swing_trades: total_trades - day_trades,
            gross_balance,
            net_balance,
            total_cost,
            total_tax,
            total_profit,
            total_loss,
            profit_factor,
            accuracy: positive_trades as f64 / total_trades as f64,
            mean_win,
            mean_loss,
            mean_win_loss_ratio,
            largest_win,
            largest_loss,
            result_std: sample_std(&results),
            drawdown: compute_drawdown(&results),
            max_consecutive_wins,
            max_consecutive_losses,
            monthly,
            average_monthly_result,
            sharpe: compute_sharpe(&monthly_nets),
            start,
            end,
            duration_days: (end - start).num_days(),
            avg_trade_duration: total_duration_days as f64 / total_trades as f64,
        })
    }

    pub fn win_rate(&self) -> f64 {
        self.accuracy
    }

    /// Compound annual growth of `reference_capital` grown by the net
    /// balance over the traded period. `None` without a positive capital or
    /// a positive duration.
    pub fn cagr(&self, reference_capital: f64) -> Option<f64> {
        if !(reference_capital > 0.0) || self.duration_days <= 0 {
            return None;
        }
        let years = self.duration_days as f64 / DAYS_PER_YEAR;
        let final_capital = reference_capital + self.net_balance;
        if final_capital <= 0.0 {
            return Some(-1.0);
        }
        Some((final_capital / reference_capital).powf(1.0 / years) - 1.0)
    }
}

fn compute_drawdown(results: &[f64]) -> Drawdown {
    let mut balance = 0.0_f64;
    let mut peak = 0.0_f64;
    let mut max_dd = 0.0_f64;
    let mut peak_at_trough = 0.0_f64;

    for r in results {
        balance += r;
        if balance > peak {
            peak = balance;
        }
        let dd = peak - balance;
        if dd > max_dd {
            max_dd = dd;
            peak_at_trough = peak;
        }
    }

    Drawdown {
        absolute: max_dd,
        relative: (peak_at_trough > 0.0).then(|| max_dd / peak_at_trough),
        relative_to_final: (balance > 0.0).then(|| max_dd / balance),
    }
}

fn compute_streaks(results: &[f64]) -> (usize, usize) {
    let (mut wins, mut losses) = (0usize, 0usize);
    let (mut max_wins, mut max_losses) = (0usize, 0usize);
    for &r in results {
        if r > 0.0 {
            wins += 1;
            losses = 0;
        } else if r < 0.0 {
            losses += 1;
            wins = 0;
        } else {
            wins = 0;
            losses = 0;
        }
        max_wins = max_wins.max(wins);
        max_losses = max_losses.max(losses);
    }
    (max_wins, max_losses)
}

fn compute_monthly(trades: &[ClosedTrade]) -> Vec<MonthlyResult> {
    let mut months: Vec<MonthlyResult> = Vec::new();
    for trade in trades {
        let key = month_key(trade.exit_time);
        let row = match months.iter_mut().find(|m| m.month == key) {
            Some(row) => row,
            None => {
                months.push(MonthlyResult {
                    month: key,
                    trades: 0,
                    gross: 0.0,
                    costs: 0.0,
                    tax: 0.0,
                    net: 0.0,
                    balance: 0.0,
                });
                let last = months.len() - 1;
                &mut months[last]
            }
        };
        row.trades += 1;
        row.gross += trade.gross_pnl;
        row.costs += trade.costs;
        row.tax += trade.tax;
        row.net += trade.net_pnl;
    }
    months.sort_by_key(|m| m.month);
    let mut balance = 0.0;
    for m in &mut months {
        balance += m.net;
        m.balance = balance;
    }
    months
}

fn compute_sharpe(monthly_nets: &[f64]) -> f64 {
    let std = sample_std(monthly_nets);
    if std > 0.0 {
        mean(monthly_nets) / std * MONTHS_PER_YEAR.sqrt()
    } else {
        0.0
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}
