//! Per-symbol order book and the price-time priority matching algorithm
//! (§4.B). The source keeps one RWMutex per book; this keeps the same shape
//! with `parking_lot::RwLock` (as the teacher's `Orderbook` does) so a single
//! writer (the engine worker) mutates while readers (snapshot, HTTP book
//! queries) observe without blocking each other out.

use super::price_level::PriceLevel;
use super::ticks::Ticks;
use crate::models::{Order, Side, Trade};
use chrono::Utc;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use uuid::Uuid;

pub struct OrderBook {
    symbol: String,
    /// Keyed ascending; enumerated in reverse for price-descending priority.
    bids: RwLock<BTreeMap<Ticks, PriceLevel>>,
    /// Keyed ascending; natural iteration order is the ask ladder.
    asks: RwLock<BTreeMap<Ticks, PriceLevel>>,
}

/// Aggregated `(price, total_remaining)` pairs, ladder order, per side.
pub struct BookSnapshot {
    pub bids: Vec<(Decimal, Decimal)>,
    pub asks: Vec<(Decimal, Decimal)>,
}

impl OrderBook {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bids: RwLock::new(BTreeMap::new()),
            asks: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.read().keys().next_back().map(|t| t.to_decimal())
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.read().keys().next().map(|t| t.to_decimal())
    }

    /// Matches `order` against the opposite side and mutates both sides as
    /// needed. Returns trades in execution order; the (possibly mutated)
    /// order is the residual after matching.
    pub fn match_incoming(&self, mut order: Order) -> (Vec<Trade>, Order) {
        let mut trades = Vec::new();

        match order.side {
            Side::Buy => self.match_against(&self.asks, &mut order, &mut trades, |best, limit| best > limit),
            Side::Sell => self.match_against(&self.bids, &mut order, &mut trades, |best, limit| best < limit),
        }

        if order.is_limit() && !order.remaining.is_zero() {
            self.rest(order.clone());
        }

        (trades, order)
    }

    /// Walks the opposite ladder head-first, draining FIFO makers until the
    /// incoming order is filled, the opposite side is exhausted, or the next
    /// level is untradeable. `stop_if_not_tradeable(best_price, order.price)`
    /// decides the latter (buys stop when `best > limit`, sells when
    /// `best < limit`), mirroring §4.B step 2.
    fn match_against(
        &self,
        opposite: &RwLock<BTreeMap<Ticks, PriceLevel>>,
        order: &mut Order,
        trades: &mut Vec<Trade>,
        stop_if_not_tradeable: impl Fn(Decimal, Decimal) -> bool,
    ) {
        let is_buy = matches!(order.side, Side::Buy);

        loop {
            if order.remaining.is_zero() {
                return;
            }

            let best_key = {
                let book = opposite.read();
                if is_buy {
                    book.keys().next().copied()
                } else {
                    book.keys().next_back().copied()
                }
            };

            let Some(key) = best_key else { return };

            if order.is_limit() && stop_if_not_tradeable(key.to_decimal(), order.price) {
                return;
            }

            let mut level_now_empty = false;
            {
                let mut book = opposite.write();
                let Some(level) = book.get_mut(&key) else { return };

                while order.remaining > Decimal::ZERO {
                    let Some(maker) = level.peek_mut() else { break };

                    let exec = order.remaining.min(maker.remaining);
                    let (buy_order_id, sell_order_id) = match order.side {
                        Side::Buy => (order.id, maker.id),
                        Side::Sell => (maker.id, order.id),
                    };
                    trades.push(Trade {
                        id: Uuid::new_v4(),
                        symbol: self.symbol.clone(),
                        buy_order_id,
                        sell_order_id,
                        price: maker.price,
                        quantity: exec,
                        executed_at: Utc::now(),
                    });

                    order.remaining -= exec;
                    maker.remaining -= exec;

                    if maker.remaining.is_zero() {
                        level.dequeue();
                    }
                }

                level_now_empty = level.is_empty();
            }

            if level_now_empty {
                opposite.write().remove(&key);
            } else {
                // The incoming exhausted its size at this level; the next
                // maker (if any) is still at the same price and is handled
                // by the next outer iteration only once this level empties.
                return;
            }
        }
    }

    /// Unconditionally places a resting order. Used by the matching path for
    /// residuals and by recovery (§4.F) to replay persisted state without
    /// matching.
    pub fn add_resting(&self, order: Order) {
        debug_assert!(order.is_limit(), "market orders never rest");
        debug_assert!(!order.remaining.is_zero(), "fully-filled orders never rest");
        self.rest(order);
    }

    fn rest(&self, order: Order) {
        let side = match order.side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        let key = Ticks::from_decimal(order.price);
        side.write().entry(key).or_insert_with(PriceLevel::new).enqueue(order);
    }

    pub fn snapshot(&self, depth: usize) -> BookSnapshot {
        let bids = {
            let book = self.bids.read();
            book.iter()
                .rev()
                .take(depth)
                .map(|(price, level)| (price.to_decimal(), level.total_remaining()))
                .collect()
        };
        let asks = {
            let book = self.asks.read();
            book.iter()
                .take(depth)
                .map(|(price, level)| (price.to_decimal(), level.total_remaining()))
                .collect()
        };
        BookSnapshot { bids, asks }
    }

    /// `max(buys) < min(sells)` or one side empty (§3, §8 non-crossed-at-rest).
    pub fn is_crossed(&self) -> bool {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => bid >= ask,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order(id: Uuid, side: Side, price: Decimal, qty: Decimal) -> Order {
        Order {
            id,
            symbol: "SYM".into(),
            side,
            price,
            quantity: qty,
            remaining: qty,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn scenario_1_empty_book_limit_buy_rests() {
        let book = OrderBook::new("SYM");
        let incoming = order(Uuid::new_v4(), Side::Buy, dec!(50), dec!(3));

        let (trades, residual) = book.match_incoming(incoming);

        assert!(trades.is_empty());
        assert_eq!(residual.remaining, dec!(3));
        assert_eq!(book.best_bid(), Some(dec!(50)));
    }

    #[test]
    fn scenario_2_buy_matches_two_sell_makers() {
        let book = OrderBook::new("SYM");
        let m1 = Uuid::new_v4();
        let m2 = Uuid::new_v4();
        book.add_resting(order(m1, Side::Sell, dec!(100), dec!(1)));
        book.add_resting(order(m2, Side::Sell, dec!(100), dec!(2)));

        let incoming = order(Uuid::new_v4(), Side::Buy, dec!(100), dec!(2.5));
        let (trades, residual) = book.match_incoming(incoming);

        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].sell_order_id, m1);
        assert_eq!(trades[0].quantity, dec!(1));
        assert_eq!(trades[1].sell_order_id, m2);
        assert_eq!(trades[1].quantity, dec!(1.5));
        assert_eq!(residual.remaining, dec!(0));

        let snap = book.snapshot(10);
        assert_eq!(snap.asks, vec![(dec!(100), dec!(0.5))]);
    }

    #[test]
    fn scenario_3_sell_matches_two_buy_makers() {
        let book = OrderBook::new("SYM");
        let b1 = Uuid::new_v4();
        let b2 = Uuid::new_v4();
        book.add_resting(order(b1, Side::Buy, dec!(100), dec!(1.5)));
        book.add_resting(order(b2, Side::Buy, dec!(100), dec!(1)));

        let incoming = order(Uuid::new_v4(), Side::Sell, dec!(100), dec!(2));
        let (trades, residual) = book.match_incoming(incoming);

        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].buy_order_id, b1);
        assert_eq!(trades[0].quantity, dec!(1.5));
        assert_eq!(trades[1].buy_order_id, b2);
        assert_eq!(trades[1].quantity, dec!(0.5));
        assert_eq!(residual.remaining, dec!(0));
    }

    #[test]
    fn scenario_4_partial_fill_then_residual_rests_at_own_price() {
        let book = OrderBook::new("SYM");
        book.add_resting(order(Uuid::new_v4(), Side::Sell, dec!(101), dec!(1)));
        book.add_resting(order(Uuid::new_v4(), Side::Sell, dec!(102), dec!(1)));

        let incoming = order(Uuid::new_v4(), Side::Buy, dec!(101), dec!(3));
        let (trades, residual) = book.match_incoming(incoming);

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, dec!(101));
        assert_eq!(trades[0].quantity, dec!(1));
        assert_eq!(residual.remaining, dec!(2));

        assert_eq!(book.best_bid(), Some(dec!(101)));
        assert_eq!(book.best_ask(), Some(dec!(102)));
    }

    #[test]
    fn scenario_5_market_order_residual_is_discarded() {
        let book = OrderBook::new("SYM");
        book.add_resting(order(Uuid::new_v4(), Side::Sell, dec!(101), dec!(5)));

        let incoming = order(Uuid::new_v4(), Side::Buy, Decimal::ZERO, dec!(10));
        let (trades, residual) = book.match_incoming(incoming);

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].quantity, dec!(5));
        assert_eq!(residual.remaining, dec!(5));
        assert!(book.best_ask().is_none());
        // Residual is a market order: it is never rested (checked by the
        // engine, which only calls add_resting for limit residuals).
    }

    #[test]
    fn never_crosses_after_a_match() {
        let book = OrderBook::new("SYM");
        book.add_resting(order(Uuid::new_v4(), Side::Sell, dec!(101), dec!(1)));
        book.add_resting(order(Uuid::new_v4(), Side::Buy, dec!(99), dec!(1)));

        let incoming = order(Uuid::new_v4(), Side::Buy, dec!(101), dec!(1));
        book.match_incoming(incoming);

        assert!(!book.is_crossed());
    }

    #[test]
    fn maker_price_rule_taker_never_improves() {
        let book = OrderBook::new("SYM");
        book.add_resting(order(Uuid::new_v4(), Side::Sell, dec!(99), dec!(1)));

        // Taker is willing to pay up to 105, but the trade executes at the
        // maker's posted price of 99.
        let incoming = order(Uuid::new_v4(), Side::Buy, dec!(105), dec!(1));
        let (trades, _) = book.match_incoming(incoming);

        assert_eq!(trades[0].price, dec!(99));
    }
}
