//! The single-writer matching engine (§4.D).
//!
//! One task (`run_worker`) owns the only inbox receiver and is the sole
//! caller of `OrderBook::match_incoming`/`add_resting`; every other task
//! (HTTP handlers, the snapshot producer, recovery) only ever reads through
//! `Arc<OrderBook>` or enqueues a submission. This mirrors the teacher's
//! `MatchingEngine`, which also keeps matching synchronous and single
//! threaded behind a channel, and fans results out asynchronously afterward.

use super::orderbook::OrderBook;
use crate::error::EngineError;
use crate::events::PublishJob;
use crate::models::{CreateOrderRequest, Order};
use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Prices and quantities must stay below this bound (§3); it exists so a
/// malformed request can't overflow `Ticks`'s fixed-point scaling.
const MAX_MAGNITUDE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

pub struct Engine {
    books: Arc<DashMap<String, Arc<OrderBook>>>,
    inbox: mpsc::Sender<Order>,
}

impl Engine {
    /// Builds the engine and its inbox. The caller is responsible for
    /// spawning [`run_worker`] against the returned receiver.
    pub fn new(inbox_capacity: usize) -> (Self, mpsc::Receiver<Order>) {
        let (tx, rx) = mpsc::channel(inbox_capacity);
        (
            Self {
                books: Arc::new(DashMap::new()),
                inbox: tx,
            },
            rx,
        )
    }

    pub fn books(&self) -> Arc<DashMap<String, Arc<OrderBook>>> {
        self.books.clone()
    }

    pub fn get_book(&self, symbol: &str) -> Option<Arc<OrderBook>> {
        self.books.get(symbol).map(|entry| entry.clone())
    }

    pub fn symbols(&self) -> Vec<String> {
        self.books.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Validates and enqueues a submission, returning its assigned id as
    /// soon as it's queued. Matching itself happens asynchronously in
    /// [`run_worker`]; the caller observes the outcome through the order and
    /// trade events the worker emits (§4.D).
    pub async fn submit(&self, request: CreateOrderRequest) -> Result<Uuid, EngineError> {
        validate(&request)?;

        let quantity = request.quantity;
        let order = Order {
            id: Uuid::new_v4(),
            symbol: request.symbol,
            side: request.side,
            price: request.price,
            quantity,
            remaining: quantity,
            created_at: Utc::now(),
        };
        let id = order.id;

        self.inbox
            .send(order)
            .await
            .map_err(|_| EngineError::InboxClosed)?;

        Ok(id)
    }

    /// Seeds a book during recovery, bypassing the inbox and matching
    /// entirely (§4.F). Must only be called before [`run_worker`] starts
    /// draining submissions.
    pub fn restore(&self, symbol: &str, order: Order) {
        let book = self
            .books
            .entry(symbol.to_string())
            .or_insert_with(|| Arc::new(OrderBook::new(symbol)))
            .clone();
        book.add_resting(order);
    }
}

fn validate(request: &CreateOrderRequest) -> Result<(), EngineError> {
    if request.symbol.trim().is_empty() {
        return Err(EngineError::EmptySymbol);
    }
    if request.price.is_sign_negative() {
        return Err(EngineError::InvalidPrice);
    }
    if request.price >= MAX_MAGNITUDE {
        return Err(EngineError::PriceTooLarge);
    }
    if request.quantity.is_sign_negative() || request.quantity.is_zero() {
        return Err(EngineError::InvalidQuantity);
    }
    if request.quantity >= MAX_MAGNITUDE {
        return Err(EngineError::QuantityTooLarge);
    }
    Ok(())
}

/// Drains the inbox one submission at a time, matches it against its
/// symbol's book, and hands the resulting trade and order output to the
/// publish queue in order: this submission's batched trades, then its own
/// residual state (§4.D). Stops on cancellation or once the inbox closes.
///
/// Hands off to `publish` rather than awaiting a sink directly: a concrete
/// [`EventSink`](crate::events::EventSink) may block on disk or network I/O,
/// and the matching hot path must never wait on that (§5). The queue send
/// itself is synchronous and never blocks.
pub async fn run_worker(
    books: Arc<DashMap<String, Arc<OrderBook>>>,
    mut inbox: mpsc::Receiver<Order>,
    publish: mpsc::UnboundedSender<PublishJob>,
    cancel: CancellationToken,
) {
    loop {
        let order = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("matching worker shutting down");
                return;
            }
            received = inbox.recv() => match received {
                Some(order) => order,
                None => {
                    tracing::info!("submission inbox closed, matching worker exiting");
                    return;
                }
            },
        };

        let book = books
            .entry(order.symbol.clone())
            .or_insert_with(|| Arc::new(OrderBook::new(order.symbol.clone())))
            .clone();

        let (trades, residual) = book.match_incoming(order);

        tracing::debug!(
            symbol = book.symbol(),
            order_id = %residual.id,
            fills = trades.len(),
            remaining = %residual.remaining,
            "submission matched"
        );

        if !trades.is_empty() && publish.send(PublishJob::Trades(trades)).is_err() {
            tracing::error!("publish queue closed, dropping order_matched event");
        }
        // A market order's unfilled residual is discarded silently (§4.B);
        // a fully-filled limit order is retired, not resting. Neither gets
        // an `order_added` event (§4.D, scenario 5).
        if residual.is_limit() && !residual.remaining.is_zero() {
            if publish.send(PublishJob::OrderAdded(residual)).is_err() {
                tracing::error!("publish queue closed, dropping order_added event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Side;
    use rust_decimal_macros::dec;

    fn request(symbol: &str, side: Side, price: Decimal, qty: Decimal) -> CreateOrderRequest {
        CreateOrderRequest { symbol: symbol.into(), side, price, quantity: qty }
    }

    #[tokio::test]
    async fn full_fill_emits_trade_but_no_order_added() {
        let (engine, inbox) = Engine::new(16);
        let (publish_tx, mut publish_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_worker(engine.books(), inbox, publish_tx, cancel.clone()));

        engine.submit(request("SYM", Side::Sell, dec!(100), dec!(1))).await.unwrap();
        engine.submit(request("SYM", Side::Buy, dec!(100), dec!(1))).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        cancel.cancel();
        handle.await.unwrap();
        publish_rx.close();

        let mut jobs = Vec::new();
        while let Ok(job) = publish_rx.try_recv() {
            jobs.push(job);
        }
        let trades = jobs.iter().filter(|j| matches!(j, PublishJob::Trades(_))).count();
        let orders = jobs.iter().filter(|j| matches!(j, PublishJob::OrderAdded(_))).count();
        assert_eq!(trades, 1);
        assert_eq!(orders, 0, "fully-filled limit orders never emit order_added");
    }

    #[tokio::test]
    async fn resting_limit_order_emits_order_added_with_residual() {
        let (engine, inbox) = Engine::new(16);
        let (publish_tx, mut publish_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_worker(engine.books(), inbox, publish_tx, cancel.clone()));

        engine.submit(request("SYM", Side::Buy, dec!(50), dec!(3))).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        cancel.cancel();
        handle.await.unwrap();
        publish_rx.close();

        let mut jobs = Vec::new();
        while let Ok(job) = publish_rx.try_recv() {
            jobs.push(job);
        }
        assert_eq!(jobs.len(), 1);
        match &jobs[0] {
            PublishJob::OrderAdded(order) => assert_eq!(order.remaining, dec!(3)),
            _ => panic!("expected an order_added job"),
        }
    }

    #[tokio::test]
    async fn market_order_residual_is_discarded_without_an_event() {
        let (engine, inbox) = Engine::new(16);
        let (publish_tx, mut publish_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_worker(engine.books(), inbox, publish_tx, cancel.clone()));

        engine.submit(request("SYM", Side::Sell, dec!(101), dec!(5))).await.unwrap();
        engine.submit(request("SYM", Side::Buy, Decimal::ZERO, dec!(10))).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        cancel.cancel();
        handle.await.unwrap();
        publish_rx.close();

        let mut jobs = Vec::new();
        while let Ok(job) = publish_rx.try_recv() {
            jobs.push(job);
        }
        let orders = jobs.iter().filter(|j| matches!(j, PublishJob::OrderAdded(_))).count();
        assert_eq!(orders, 0);
    }

    #[tokio::test]
    async fn rejects_oversized_quantity() {
        let (engine, _inbox) = Engine::new(4);
        let err = engine
            .submit(request("SYM", Side::Buy, dec!(10), dec!(1_000_000_000)))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::QuantityTooLarge));
    }

    #[tokio::test]
    async fn rejects_empty_symbol() {
        let (engine, _inbox) = Engine::new(4);
        let err = engine.submit(request("  ", Side::Buy, dec!(10), dec!(1))).await.unwrap_err();
        assert!(matches!(err, EngineError::EmptySymbol));
    }
}
