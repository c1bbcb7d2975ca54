//! Realized profit/loss of one order, attributed by FIFO lot matching over
//! the fill history of its symbol.
//!
//! Each filled order in the history contributes one fill event
//! `(filled_at, ±filled_qty, filled_avg_price)`. Fills are replayed in time
//! order (fills without a timestamp first, ties kept in history order).
//! A fill in the direction of the open position adds a lot at the back of
//! the queue; an opposite fill closes lots from the front and realizes
//! `matched * sign * (lot_price - fill_price)` with `sign = +1` when a sell
//! closes long lots and `-1` when a buy closes short lots. Quantity left
//! over after every lot is closed flips the position and is queued at the
//! front as a new lot.

use crate::domain::trading::types::{Order, OrderClass, OrderStatus};
use std::collections::VecDeque;

/// Quantities closer to zero than this are treated as zero.
const QTY_EPSILON: f64 = 1e-9;

/// Open, unmatched quantity at its acquisition price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lot {
    pub quantity: f64,
    pub price: f64,
}

/// Open lots and the running signed position (positive = net long).
#[derive(Debug, Clone, Default)]
pub struct LotLedger {
    lots: VecDeque<Lot>,
    position: f64,
}

impl LotLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn lots(&self) -> impl Iterator<Item = &Lot> {
        self.lots.iter()
    }

    fn is_flat(&self) -> bool {
        self.position.abs() <= QTY_EPSILON
    }

    /// Apply one fill. Returns the P&L it realized, or `None` when the fill
    /// opened or extended the position.
    pub fn apply(&mut self, signed_qty: f64, price: f64) -> Option<f64> {
        if signed_qty.abs() <= QTY_EPSILON {
            return None;
        }

        if self.is_flat() || (self.position > 0.0) == (signed_qty > 0.0) {
            self.lots.push_back(Lot {
                quantity: signed_qty.abs(),
                price,
            });
            self.position += signed_qty;
            return None;
        }

        Some(self.close(signed_qty, price))
    }

    fn close(&mut self, signed_qty: f64, price: f64) -> f64 {
        let direction = signed_qty.signum();
        let sign = if signed_qty < 0.0 { 1.0 } else { -1.0 };
        let mut remaining = signed_qty.abs();
        let mut pnl = 0.0;

        while remaining > QTY_EPSILON {
            let Some(front) = self.lots.front_mut() else {
                break;
            };

            let matched = remaining.min(front.quantity);
            pnl += matched * sign * (front.price - price);
            remaining -= matched;
            self.position += direction * matched;

            if front.quantity - matched > QTY_EPSILON {
                front.quantity -= matched;
            } else {
                self.lots.pop_front();
            }
        }

        if remaining > QTY_EPSILON {
            // Position flipped: the remainder opens exposure the other way.
            self.lots.push_front(Lot {
                quantity: remaining,
                price,
            });
            self.position += direction * remaining;
        }

        pnl
    }
}

/// Closed-trade P&L of a bracket order whose exit leg has filled.
fn bracket_pnl(target: &Order) -> Option<f64> {
    if target.order_class != Some(OrderClass::Bracket) {
        return None;
    }

    let entry_price = target.filled_avg_price()?;
    let leg = target
        .legs
        .as_ref()?
        .iter()
        .find(|leg| leg.status == OrderStatus::Filled && leg.is_filled())?;
    let exit_price = leg.filled_avg_price()?;

    Some(leg.filled_qty() * exit_price - target.filled_qty() * entry_price)
}

/// Realized P&L attributable to `target` given every order for its symbol.
///
/// Returns `None` when `target` is unfilled, absent from `history`, or its
/// fill opened or added to the position.
pub fn realized_pnl(target: &Order, history: &[Order]) -> Option<f64> {
    if let Some(pnl) = bracket_pnl(target) {
        return Some(pnl);
    }

    target.filled_avg_price()?;

    let mut fills: Vec<&Order> = history
        .iter()
        .filter(|order| order.symbol == target.symbol && order.is_filled())
        .collect();
    fills.sort_by_key(|order| order.filled_at);

    let mut ledger = LotLedger::new();
    for fill in fills {
        let Some(price) = fill.filled_avg_price() else {
            continue;
        };

        let realized = ledger.apply(fill.signed_filled_qty(), price);
        if fill.id == target.id {
            return realized;
        }
    }

    None
}

impl Order {
    /// See [`realized_pnl`].
    pub fn realized_pnl(&self, history: &[Order]) -> Option<f64> {
        realized_pnl(self, history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::numeric::NumericString;
    use crate::domain::trading::types::{OrderSide, OrderType, TimeInForce};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 14, 14, 30, 0).unwrap() + Duration::minutes(minute)
    }

    fn fill(symbol: &str, side: OrderSide, qty: f64, price: Option<f64>, minute: Option<i64>) -> Order {
        Order {
            id: Uuid::new_v4(),
            client_order_id: String::new(),
            created_at: at(0),
            updated_at: None,
            submitted_at: None,
            filled_at: minute.map(at),
            expired_at: None,
            canceled_at: None,
            failed_at: None,
            replaced_at: None,
            replaced_by: None,
            replaces: None,
            asset_id: None,
            symbol: symbol.to_string(),
            asset_class: None,
            qty: Some(NumericString::new(qty)),
            filled_qty: NumericString::new(if price.is_some() { qty } else { 0.0 }),
            order_type: OrderType::Market,
            side,
            time_in_force: TimeInForce::Day,
            limit_price: None,
            stop_price: None,
            filled_avg_price: price.map(NumericString::new),
            status: if price.is_some() {
                OrderStatus::Filled
            } else {
                OrderStatus::New
            },
            extended_hours: false,
            legs: None,
            order_class: None,
            trail_price: None,
            trail_percent: None,
            notional: None,
            position_intent: None,
        }
    }

    fn buy(qty: f64, price: f64, minute: i64) -> Order {
        fill("AAPL", OrderSide::Buy, qty, Some(price), Some(minute))
    }

    fn sell(qty: f64, price: f64, minute: i64) -> Order {
        fill("AAPL", OrderSide::Sell, qty, Some(price), Some(minute))
    }

    #[test]
    fn test_partial_close_matches_oldest_lot() {
        let target = sell(8.0, 120.0, 3);
        let history = vec![buy(10.0, 100.0, 1), buy(5.0, 110.0, 2), target.clone()];

        assert_eq!(realized_pnl(&target, &history), Some(-160.0));
    }

    #[test]
    fn test_position_flip_counts_matched_units_only() {
        let target = sell(8.0, 90.0, 2);
        let history = vec![buy(5.0, 100.0, 1), target.clone()];

        assert_eq!(realized_pnl(&target, &history), Some(50.0));
    }

    #[test]
    fn test_flipped_remainder_is_closed_by_later_fill() {
        let cover = buy(3.0, 80.0, 3);
        let history = vec![buy(5.0, 100.0, 1), sell(8.0, 90.0, 2), cover.clone()];

        // Short lot of 3 opened at 90, bought back at 80.
        assert_eq!(realized_pnl(&cover, &history), Some(3.0 * -1.0 * (90.0 - 80.0)));
    }

    #[test]
    fn test_close_spans_multiple_lots() {
        let target = sell(12.0, 120.0, 3);
        let history = vec![buy(10.0, 100.0, 1), buy(5.0, 110.0, 2), target.clone()];

        let expected = 10.0 * (100.0 - 120.0) + 2.0 * (110.0 - 120.0);
        assert_eq!(realized_pnl(&target, &history), Some(expected));
    }

    #[test]
    fn test_same_direction_fill_realizes_nothing() {
        let first = buy(10.0, 100.0, 1);
        let second = buy(5.0, 110.0, 2);
        let history = vec![first.clone(), second.clone(), sell(8.0, 120.0, 3)];

        assert_eq!(realized_pnl(&first, &history), None);
        assert_eq!(realized_pnl(&second, &history), None);
    }

    #[test]
    fn test_unfilled_or_unknown_target_is_none() {
        let pending = fill("AAPL", OrderSide::Sell, 5.0, None, None);
        let history = vec![buy(10.0, 100.0, 1), pending.clone()];
        assert_eq!(realized_pnl(&pending, &history), None);

        let stranger = sell(5.0, 120.0, 5);
        assert_eq!(realized_pnl(&stranger, &history), None);
    }

    #[test]
    fn test_history_is_replayed_in_time_order() {
        let target = sell(8.0, 120.0, 3);
        let history = vec![target.clone(), buy(5.0, 110.0, 2), buy(10.0, 100.0, 1)];

        assert_eq!(realized_pnl(&target, &history), Some(-160.0));
    }

    #[test]
    fn test_missing_fill_time_sorts_first() {
        let undated = fill("AAPL", OrderSide::Buy, 4.0, Some(95.0), None);
        let target = sell(4.0, 100.0, 2);
        let history = vec![buy(6.0, 105.0, 1), target.clone(), undated];

        assert_eq!(realized_pnl(&target, &history), Some(4.0 * (95.0 - 100.0)));
    }

    #[test]
    fn test_equal_timestamps_keep_history_order() {
        let target = sell(5.0, 100.0, 2);
        let history = vec![buy(5.0, 90.0, 1), buy(5.0, 80.0, 1), target.clone()];
        assert_eq!(realized_pnl(&target, &history), Some(5.0 * (90.0 - 100.0)));

        let reordered = vec![buy(5.0, 80.0, 1), buy(5.0, 90.0, 1), target.clone()];
        assert_eq!(realized_pnl(&target, &reordered), Some(5.0 * (80.0 - 100.0)));
    }

    #[test]
    fn test_other_symbols_are_ignored() {
        let target = sell(5.0, 100.0, 3);
        let history = vec![
            fill("MSFT", OrderSide::Buy, 5.0, Some(10.0), Some(1)),
            buy(5.0, 90.0, 2),
            target.clone(),
        ];

        assert_eq!(realized_pnl(&target, &history), Some(5.0 * (90.0 - 100.0)));
    }

    #[test]
    fn test_short_cover_uses_negative_sign() {
        let target = buy(4.0, 45.0, 2);
        let history = vec![sell(10.0, 50.0, 1), target.clone()];

        assert_eq!(realized_pnl(&target, &history), Some(4.0 * -1.0 * (50.0 - 45.0)));
    }

    #[test]
    fn test_bracket_shortcut_skips_history() {
        let mut leg = sell(10.0, 55.0, 5);
        leg.status = OrderStatus::Filled;
        let mut parent = buy(10.0, 50.0, 1);
        parent.order_class = Some(OrderClass::Bracket);
        parent.legs = Some(vec![fill("AAPL", OrderSide::Sell, 10.0, None, None), leg]);

        assert_eq!(realized_pnl(&parent, &[]), Some(10.0 * 55.0 - 10.0 * 50.0));
        assert_eq!(parent.realized_pnl(&[]), Some(50.0));
    }

    #[test]
    fn test_bracket_without_filled_leg_uses_fifo() {
        let mut parent = buy(10.0, 50.0, 1);
        parent.order_class = Some(OrderClass::Bracket);
        parent.legs = Some(vec![fill("AAPL", OrderSide::Sell, 10.0, None, None)]);

        assert_eq!(realized_pnl(&parent, &[parent.clone()]), None);
    }

    #[test]
    fn test_ledger_tracks_position_and_lots() {
        let mut ledger = LotLedger::new();
        assert_eq!(ledger.apply(10.0, 100.0), None);
        assert_eq!(ledger.apply(5.0, 110.0), None);
        assert_eq!(ledger.apply(-12.0, 120.0), Some(-220.0));

        assert!((ledger.position() - 3.0).abs() < 1e-9);
        let lots: Vec<Lot> = ledger.lots().copied().collect();
        assert_eq!(lots, vec![Lot { quantity: 3.0, price: 110.0 }]);

        assert_eq!(ledger.apply(-5.0, 100.0), Some(3.0 * (110.0 - 100.0)));
        assert!((ledger.position() + 2.0).abs() < 1e-9);
        let lots: Vec<Lot> = ledger.lots().copied().collect();
        assert_eq!(lots, vec![Lot { quantity: 2.0, price: 100.0 }]);
    }
}
