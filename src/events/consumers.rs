//! Persistence consumers: drain the event fanout and write orders/trades to
//! the relational store (§4.G). Writes are idempotent (`ON CONFLICT DO
//! NOTHING`/`UPSERT`) so a crash-and-replay from the durable log never
//! double-counts a fill, mirroring the source's persistence worker
//! (`OrderFlowOrchestrator::start_persistence_worker`).
//!
//! Two independent consumer groups, each on its own fanout subscription, per
//! §4.G: `run_order_consumer` only ever writes `orders`, `run_trade_consumer`
//! only ever writes `trades`. A single shared consumer would let a stalled
//! trade insert (e.g. while its order counterpart is still in flight) block
//! every later `order_added` event behind it; splitting the subscriptions
//! means a stall in one group never holds up the other.

use super::{Event, OrderEvent, TradeEvent};
use crate::db::Database;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Reconnect backoff applied after a persistence failure before retrying the
/// same event, so a transient database outage doesn't drop events.
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

pub async fn run_order_consumer(
    mut events: broadcast::Receiver<Event>,
    db: Database,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("order consumer shutting down");
                return;
            }
            received = events.recv() => received,
        };

        match event {
            Ok(Event::OrderAdded(order)) => persist_order_with_retry(&db, &order, &cancel).await,
            Ok(Event::OrderMatched(_)) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "order consumer lagged behind the event fanout");
            }
            Err(broadcast::error::RecvError::Closed) => {
                tracing::info!("event fanout closed, stopping order consumer");
                return;
            }
        }
    }
}

pub async fn run_trade_consumer(
    mut events: broadcast::Receiver<Event>,
    db: Database,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("trade consumer shutting down");
                return;
            }
            received = events.recv() => received,
        };

        match event {
            Ok(Event::OrderMatched(trades)) => persist_trades_with_retry(&db, &trades, &cancel).await,
            Ok(Event::OrderAdded(_)) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "trade consumer lagged behind the event fanout");
            }
            Err(broadcast::error::RecvError::Closed) => {
                tracing::info!("event fanout closed, stopping trade consumer");
                return;
            }
        }
    }
}

async fn persist_order_with_retry(db: &Database, order: &OrderEvent, cancel: &CancellationToken) {
    loop {
        match db.upsert_order(order).await {
            Ok(()) => return,
            Err(err) => {
                tracing::error!(%err, ?order, "failed to persist order, retrying");
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(RETRY_BACKOFF) => {}
                }
            }
        }
    }
}

async fn persist_trades_with_retry(db: &Database, trades: &[TradeEvent], cancel: &CancellationToken) {
    loop {
        match db.insert_trades(trades).await {
            Ok(()) => return,
            Err(err) => {
                tracing::error!(%err, ?trades, "failed to persist trades, retrying");
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(RETRY_BACKOFF) => {}
                }
            }
        }
    }
}
