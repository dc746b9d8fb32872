//! Position and accounting state machine.
//!
//! ```text
//! Flat --Buy/Sell--> Open --Close--> Flat
//!                    Open --Invert--> Open (opposite direction)
//! ```
//!
//! Every other combination is a [`TransitionError`]. An accepted order is
//! appended to the order history; a closing order appends one
//! [`ClosedTrade`] and re-settles the tax of its exit month.

use chrono::NaiveDateTime;
use tracing::debug;

use crate::domain::error::{RegistryState, TradesimError, TransitionError};
use crate::domain::metrics::MetricsSnapshot;
use crate::domain::order::{OrderKind, TradeOrder};
use crate::domain::position::{ClosedTrade, Direction, Position};
use crate::domain::tax::{self, TaxRates};

#[derive(Debug, Clone)]
pub struct TradeRegistry {
    point_value: f64,
    cost_per_trade: f64,
    tax_rates: TaxRates,
    position: Option<Position>,
    trades: Vec<ClosedTrade>,
    orders: Vec<TradeOrder>,
    last_timestamp: Option<NaiveDateTime>,
    truncated: bool,
}

impl TradeRegistry {
    pub fn new(point_value: f64, cost_per_trade: f64) -> Self {
        Self {
            point_value,
            cost_per_trade,
            tax_rates: TaxRates::default(),
            position: None,
            trades: Vec::new(),
            orders: Vec::new(),
            last_timestamp: None,
            truncated: false,
        }
    }

    pub fn point_value(&self) -> f64 {
        self.point_value
    }

    pub fn cost_per_trade(&self) -> f64 {
        self.cost_per_trade
    }

    pub fn tax_rates(&self) -> &TaxRates {
        &self.tax_rates
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn state(&self) -> RegistryState {
        match &self.position {
            Some(p) => RegistryState::Open(p.direction),
            None => RegistryState::Flat,
        }
    }

    /// Closed trades in close order.
    pub fn trades(&self) -> &[ClosedTrade] {
        &self.trades
    }

    /// Every accepted order in arrival order.
    pub fn orders(&self) -> &[TradeOrder] {
        &self.orders
    }

    /// True when the run feeding this registry stopped early.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub(crate) fn mark_truncated(&mut self) {
        self.truncated = true;
    }

    /// Metrics over the closed trades, or `None` when there are none.
    pub fn get_result(&self) -> Option<MetricsSnapshot> {
        MetricsSnapshot::compute(&self.trades)
    }

    /// Applies one order. On error the registry is left unchanged.
    pub fn register(&mut self, order: TradeOrder) -> Result<(), TransitionError> {
        self.check_order(&order)?;

        match (order.kind, self.position.take()) {
            (OrderKind::Buy, None) => self.open(Direction::Long, &order),
            (OrderKind::Sell, None) => self.open(Direction::Short, &order),
            (OrderKind::Close, Some(position)) => {
                self.close(position, &order);
            }
            (OrderKind::Invert, Some(position)) => {
                let next = position.direction.opposite();
                self.close(position, &order);
                self.open(next, &order);
            }
            (kind, position) => {
                let state = match &position {
                    Some(p) => RegistryState::Open(p.direction),
                    None => RegistryState::Flat,
                };
                self.position = position;
                return Err(TransitionError::InvalidTransition { order: kind, state });
            }
        }

        self.last_timestamp = Some(order.timestamp);
        self.orders.push(order);
        Ok(())
    }

    fn check_order(&self, order: &TradeOrder) -> Result<(), TransitionError> {
        let reject = |reason: &str| {
            Err(TransitionError::InvalidOrder {
                order: order.kind,
                reason: reason.to_string(),
            })
        };
        if !order.price.is_finite() {
            return reject("price is not finite");
        }
        if order.kind != OrderKind::Close && !(order.amount.is_finite() && order.amount > 0.0) {
            return reject("amount must be positive");
        }
        if let Some(slippage) = order.slippage {
            if !slippage.is_finite() || slippage < 0.0 {
                return reject("slippage must be non-negative");
            }
        }
        if let Some(last) = self.last_timestamp {
            if order.timestamp < last {
                return reject("timestamp precedes the previous order");
            }
        }
        Ok(())
    }

    fn open(&mut self, direction: Direction, order: &TradeOrder) {
        debug!(
            direction = %direction,
            price = order.price,
            amount = order.amount,
            at = %order.timestamp,
            "position opened"
        );
        self.position = Some(Position {
            direction,
            entry_price: order.price,
            entry_time: order.timestamp,
            amount: order.amount,
            entry_slippage: order.slippage.unwrap_or(0.0),
            entry_info: order.info.clone(),
        });
    }

    fn close(&mut self, position: Position, order: &TradeOrder) {
        let amount = position.amount;
        let gross_pnl = position.unrealized_pnl(order.price, self.point_value);
        let slippage = position.entry_slippage + order.slippage.unwrap_or(0.0);
        let costs = self.cost_per_trade * amount + slippage * self.point_value * amount;

        debug!(
            direction = %position.direction,
            entry = position.entry_price,
            exit = order.price,
            gross = gross_pnl,
            at = %order.timestamp,
            "position closed"
        );

        self.trades.push(ClosedTrade {
            direction: position.direction,
            entry_price: position.entry_price,
            entry_time: position.entry_time,
            exit_price: order.price,
            exit_time: order.timestamp,
            amount,
            gross_pnl,
            costs,
            tax: 0.0,
            net_pnl: gross_pnl - costs,
            entry_info: position.entry_info,
            exit_info: order.info.clone(),
            comment: order.comment.clone(),
        });
        self.settle_last_month();
    }

    fn settle_last_month(&mut self) {
        let Some(last) = self.trades.last() else {
            return;
        };
        let key = tax::month_key(last.exit_time);
        let start = self
            .trades
            .iter()
            .rposition(|t| tax::month_key(t.exit_time) != key)
            .map_or(0, |i| i + 1);
        tax::settle_month(&mut self.trades[start..], &self.tax_rates);
    }

    /// Merges flat registries from independent runs into one, ordering
    /// trades by exit time and re-settling every month.
    pub fn join<I>(registries: I) -> Result<TradeRegistry, TradesimError>
    where
        I: IntoIterator<Item = TradeRegistry>,
    {
        let mut iter = registries.into_iter();
        let Some(mut joined) = iter.next() else {
            return Err(TradesimError::Data {
                reason: "no registries to join".to_string(),
            });
        };
        if joined.position.is_some() {
            return Err(open_position_error());
        }
        for other in iter {
            if other.point_value != joined.point_value
                || other.cost_per_trade != joined.cost_per_trade
                || other.tax_rates != joined.tax_rates
            {
                return Err(TradesimError::Data {
                    reason: "registries use different point value, costs or tax rates".to_string(),
                });
            }
            if other.position.is_some() {
                return Err(open_position_error());
            }
            joined.trades.extend(other.trades);
            joined.orders.extend(other.orders);
            joined.truncated |= other.truncated;
            joined.last_timestamp = joined.last_timestamp.max(other.last_timestamp);
        }
        joined.trades.sort_by_key(|t| t.exit_time);
        joined.orders.sort_by_key(|o| o.timestamp);
        tax::settle_all(&mut joined.trades, &joined.tax_rates);
        Ok(joined)
    }
}

fn open_position_error() -> TradesimError {
    TradesimError::Data {
        reason: "cannot join a registry with an open position".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{DecisionInfo, DecisionRecord};
    use crate::domain::signal::Side;
    use chrono::NaiveDate;

    fn ts(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn order(kind: OrderKind, price: f64, day: u32, hour: u32) -> TradeOrder {
        TradeOrder::new(kind, price, ts(day, hour))
    }

    #[test]
    fn buy_then_close_books_one_trade() {
        let mut reg = TradeRegistry::new(10.0, 2.0);
        reg.register(order(OrderKind::Buy, 100.0, 2, 10)).unwrap();
        assert_eq!(reg.state(), RegistryState::Open(Direction::Long));
        reg.register(order(OrderKind::Close, 99.0, 3, 10)).unwrap();
        assert_eq!(reg.state(), RegistryState::Flat);

        let t = &reg.trades()[0];
        assert!((t.gross_pnl + 10.0).abs() < 1e-9);
        assert!((t.costs - 2.0).abs() < 1e-9);
        assert_eq!(t.tax, 0.0);
        assert!((t.net_pnl + 12.0).abs() < 1e-9);
        assert_eq!(reg.orders().len(), 2);
    }

    #[test]
    fn short_profits_when_price_falls() {
        let mut reg = TradeRegistry::new(1.0, 0.0);
        reg.register(order(OrderKind::Sell, 50.0, 2, 10)).unwrap();
        reg.register(order(OrderKind::Close, 40.0, 2, 12)).unwrap();
        let t = &reg.trades()[0];
        assert!((t.gross_pnl - 10.0).abs() < 1e-9);
        // same-day winner: day-trade rate
        assert!((t.tax - 2.0).abs() < 1e-9);
        assert!((t.net_pnl - 8.0).abs() < 1e-9);
    }

    #[test]
    fn invert_closes_and_reopens_atomically() {
        let mut reg = TradeRegistry::new(1.0, 0.0);
        reg.register(order(OrderKind::Buy, 10.0, 2, 10)).unwrap();
        reg.register(order(OrderKind::Invert, 12.0, 3, 10)).unwrap();
        assert_eq!(reg.trades().len(), 1);
        assert_eq!(reg.trades()[0].direction, Direction::Long);
        let pos = reg.position().unwrap();
        assert_eq!(pos.direction, Direction::Short);
        assert_eq!(pos.entry_price, 12.0);
        assert_eq!(pos.entry_time, reg.trades()[0].exit_time);
    }

    #[test]
    fn invalid_transitions_leave_state_unchanged() {
        let mut reg = TradeRegistry::new(1.0, 0.0);
        let err = reg.register(order(OrderKind::Close, 10.0, 2, 10)).unwrap_err();
        assert_eq!(
            err,
            TransitionError::InvalidTransition {
                order: OrderKind::Close,
                state: RegistryState::Flat
            }
        );
        assert!(reg.register(order(OrderKind::Invert, 10.0, 2, 10)).is_err());

        reg.register(order(OrderKind::Buy, 10.0, 2, 10)).unwrap();
        let err = reg.register(order(OrderKind::Sell, 11.0, 2, 11)).unwrap_err();
        assert!(matches!(err, TransitionError::InvalidTransition { .. }));
        assert_eq!(reg.state(), RegistryState::Open(Direction::Long));
        assert_eq!(reg.orders().len(), 1);
    }

    #[test]
    fn rejects_malformed_orders() {
        let mut reg = TradeRegistry::new(1.0, 0.0);
        assert!(reg.register(order(OrderKind::Buy, f64::NAN, 2, 10)).is_err());
        assert!(reg
            .register(order(OrderKind::Buy, 10.0, 2, 10).with_amount(0.0))
            .is_err());
        assert!(reg
            .register(order(OrderKind::Buy, 10.0, 2, 10).with_slippage(-1.0))
            .is_err());
        reg.register(order(OrderKind::Buy, 10.0, 2, 10)).unwrap();
        let err = reg.register(order(OrderKind::Close, 10.0, 1, 10)).unwrap_err();
        assert!(matches!(err, TransitionError::InvalidOrder { .. }));
    }

    #[test]
    fn costs_scale_with_amount_and_slippage() {
        let mut reg = TradeRegistry::new(5.0, 1.0);
        reg.register(
            order(OrderKind::Buy, 100.0, 2, 10)
                .with_amount(2.0)
                .with_slippage(0.5),
        )
        .unwrap();
        reg.register(order(OrderKind::Close, 100.0, 3, 10).with_slippage(0.5))
            .unwrap();
        // 1*2 + (0.5+0.5)*5*2
        assert!((reg.trades()[0].costs - 12.0).abs() < 1e-9);
    }

    #[test]
    fn later_loss_in_month_resettles_earlier_tax() {
        let mut reg = TradeRegistry::new(1.0, 0.0);
        reg.register(order(OrderKind::Buy, 10.0, 2, 10)).unwrap();
        reg.register(order(OrderKind::Close, 20.0, 2, 11)).unwrap();
        assert!((reg.trades()[0].tax - 2.0).abs() < 1e-9);
        reg.register(order(OrderKind::Buy, 20.0, 3, 10)).unwrap();
        reg.register(order(OrderKind::Close, 5.0, 3, 11)).unwrap();
        assert_eq!(reg.trades()[0].tax, 0.0);
        assert!((reg.trades()[0].net_pnl - 10.0).abs() < 1e-9);
    }

    #[test]
    fn entry_and_exit_info_are_kept() {
        let info = DecisionInfo {
            decisions: vec![DecisionRecord {
                label: "ma".into(),
                side: Side::Long,
                strength: 0.5,
            }],
        };
        let mut reg = TradeRegistry::new(1.0, 0.0);
        reg.register(order(OrderKind::Buy, 10.0, 2, 10).with_info(info.clone()))
            .unwrap();
        reg.register(order(OrderKind::Close, 11.0, 3, 10)).unwrap();
        assert_eq!(reg.trades()[0].entry_info.as_ref(), Some(&info));
        assert!(reg.trades()[0].exit_info.is_none());
    }

    #[test]
    fn get_result_is_none_without_trades() {
        let reg = TradeRegistry::new(1.0, 0.0);
        assert!(reg.get_result().is_none());
    }

    #[test]
    fn join_orders_by_exit_and_merges_flags() {
        let mut a = TradeRegistry::new(1.0, 0.0);
        a.register(order(OrderKind::Buy, 10.0, 10, 10)).unwrap();
        a.register(order(OrderKind::Close, 12.0, 11, 10)).unwrap();
        let mut b = TradeRegistry::new(1.0, 0.0);
        b.register(order(OrderKind::Buy, 10.0, 2, 10)).unwrap();
        b.register(order(OrderKind::Close, 9.0, 3, 10)).unwrap();
        b.mark_truncated();

        let joined = TradeRegistry::join([a, b]).unwrap();
        assert_eq!(joined.trades().len(), 2);
        assert!(joined.trades()[0].exit_time < joined.trades()[1].exit_time);
        assert!(joined.is_truncated());
        // month total +1 is taxed at the swing rate after the loss offset
        let tax: f64 = joined.trades().iter().map(|t| t.tax).sum();
        assert!((tax - 0.15).abs() < 1e-9);
    }

    #[test]
    fn join_rejects_mismatched_costs() {
        let a = TradeRegistry::new(1.0, 0.0);
        let b = TradeRegistry::new(1.0, 2.0);
        assert!(TradeRegistry::join([a, b]).is_err());
    }
}
