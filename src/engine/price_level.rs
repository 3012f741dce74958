//! FIFO queue of resting orders at a single price (§4.A).

use crate::models::Order;
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct PriceLevel {
    orders: VecDeque<Order>,
}

impl PriceLevel {
    pub fn new() -> Self {
        Self { orders: VecDeque::new() }
    }

    /// Mutable access to the oldest resting order, for in-place fills.
    pub fn peek_mut(&mut self) -> Option<&mut Order> {
        self.orders.front_mut()
    }

    /// Removes and returns the oldest resting order.
    pub fn dequeue(&mut self) -> Option<Order> {
        self.orders.pop_front()
    }

    /// Appends an order to the tail (newest).
    pub fn enqueue(&mut self, order: Order) {
        self.orders.push_back(order);
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn total_remaining(&self) -> rust_decimal::Decimal {
        self.orders.iter().map(|o| o.remaining).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Side;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn order(remaining: rust_decimal::Decimal) -> Order {
        Order {
            id: Uuid::new_v4(),
            symbol: "BTCUSD".into(),
            side: Side::Buy,
            price: dec!(100),
            quantity: remaining,
            remaining,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn fifo_order_preserved() {
        let mut level = PriceLevel::new();
        let first = order(dec!(1));
        let first_id = first.id;
        level.enqueue(first);
        level.enqueue(order(dec!(2)));

        assert_eq!(level.dequeue().unwrap().id, first_id);
        assert_eq!(level.len(), 1);
    }
}
