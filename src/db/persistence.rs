//! Order/trade persistence queries, plus the recovery join query (§4.F).

use super::Database;
use crate::error::EngineError;
use crate::events::{OrderEvent, TradeEvent};
use crate::models::{Order, Side};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

impl Database {
    /// Upserts an order's current state. Called once per submission after
    /// matching settles, with the order's post-match `remaining` (§4.D); safe
    /// to replay, since it only ever overwrites with the same final values.
    pub async fn upsert_order(&self, order: &OrderEvent) -> Result<(), EngineError> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, symbol, side, price, quantity, remaining, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET remaining = excluded.remaining
            "#,
        )
        .bind(order.order_id)
        .bind(&order.symbol)
        .bind(order.side)
        .bind(order.price)
        .bind(order.quantity)
        .bind(order.remaining)
        .bind(order.created_at)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Inserts every trade from one submission's `order_matched` batch.
    /// Idempotent under replay from the durable log: a trade id is only ever
    /// generated once, so `ON CONFLICT DO NOTHING` is enough (§4.G). Stops at
    /// the first failure, leaving the remaining trades for the caller's retry.
    pub async fn insert_trades(&self, trades: &[TradeEvent]) -> Result<(), EngineError> {
        for trade in trades {
            sqlx::query(
                r#"
                INSERT INTO trades (id, symbol, buy_order_id, sell_order_id, price, quantity, executed_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(trade.trade_id)
            .bind(&trade.symbol)
            .bind(trade.buy_order_id)
            .bind(trade.sell_order_id)
            .bind(trade.price)
            .bind(trade.quantity)
            .bind(trade.executed_at)
            .execute(self.pool())
            .await?;
        }

        Ok(())
    }

    /// Reconstructs resting order state for every symbol: each order's
    /// `remaining` is the original quantity minus everything it has traded,
    /// discarding orders that are fully filled. Sort order within a symbol
    /// is price-time priority, the buy side descending and the sell side
    /// ascending, matching the source's `RetrieveOrderBooks` query.
    pub async fn fetch_recovery_rows(&self) -> Result<Vec<RecoveredOrder>, EngineError> {
        let rows = sqlx::query_as::<_, RecoveredOrder>(
            r#"
            SELECT o.id, o.symbol, o.side, o.price, o.quantity, o.created_at,
                   (o.quantity - COALESCE(SUM(
                       CASE
                           WHEN o.id = t.buy_order_id THEN t.quantity
                           WHEN o.id = t.sell_order_id THEN t.quantity
                           ELSE 0
                       END
                   ), 0)) AS remaining
            FROM orders o
            LEFT JOIN trades t
                ON o.id = t.buy_order_id OR o.id = t.sell_order_id
            GROUP BY o.id
            HAVING (o.quantity - COALESCE(SUM(
                       CASE
                           WHEN o.id = t.buy_order_id THEN t.quantity
                           WHEN o.id = t.sell_order_id THEN t.quantity
                           ELSE 0
                       END
                   ), 0)) > 0
            ORDER BY o.symbol,
                     CASE WHEN o.side = 'buy' THEN -o.price ELSE o.price END,
                     o.created_at
            "#,
        )
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }
}

/// One resting order as reconstructed from the `orders`/`trades` join. Not
/// `Order` itself: `remaining` here is a computed aggregate, not a stored
/// column, and market orders never appear (they never rest, so they are
/// never short a non-positive `remaining` away from being filtered out).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecoveredOrder {
    pub id: Uuid,
    pub symbol: String,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
    pub created_at: DateTime<Utc>,
    pub remaining: Decimal,
}

impl From<RecoveredOrder> for Order {
    fn from(row: RecoveredOrder) -> Self {
        Order {
            id: row.id,
            symbol: row.symbol,
            side: row.side,
            price: row.price,
            quantity: row.quantity,
            remaining: row.remaining,
            created_at: row.created_at,
        }
    }
}
