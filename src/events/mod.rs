//! Durable event pipeline (§4.C, §4.G).
//!
//! The source fans order and trade events out to a partitioned broker; this
//! stands a single [`EventSink`] trait in that seam so the engine worker
//! never talks to a concrete transport directly. [`LogEventSink`] is the
//! production implementation (an append-only ndjson file plus an in-process
//! broadcast fanout for the WebSocket and persistence consumers);
//! [`ChannelEventSink`] is a test double used by engine unit tests.

pub mod consumers;
pub mod log_sink;
pub mod publisher;

use crate::models::{Order, Trade};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use log_sink::LogEventSink;
pub use publisher::{run_publisher, PublishJob};

/// Envelope persisted to the event log and broadcast to subscribers.
/// `{"type": "order_added" | "order_matched", "payload": ...}`, matching the
/// shape the source publishes to its Kafka topics. `OrderMatched` carries
/// every fill produced by one submission as a single batch, not one event
/// per fill (§4.D).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    #[serde(rename = "order_added")]
    OrderAdded(OrderEvent),
    #[serde(rename = "order_matched")]
    OrderMatched(Vec<TradeEvent>),
}

/// Emitted once per submission after matching, carrying the order's residual
/// state (§4.D). `filled = quantity - remaining`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEvent {
    pub order_id: uuid::Uuid,
    pub symbol: String,
    pub side: crate::models::Side,
    pub price: rust_decimal::Decimal,
    pub quantity: rust_decimal::Decimal,
    pub remaining: rust_decimal::Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<&Order> for OrderEvent {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            symbol: order.symbol.clone(),
            side: order.side,
            price: order.price,
            quantity: order.quantity,
            remaining: order.remaining,
            created_at: order.created_at,
        }
    }
}

/// Emitted once per fill, in execution order, before the order event for the
/// submission that produced it (§4.D).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeEvent {
    pub trade_id: uuid::Uuid,
    pub symbol: String,
    pub buy_order_id: uuid::Uuid,
    pub sell_order_id: uuid::Uuid,
    pub price: rust_decimal::Decimal,
    pub quantity: rust_decimal::Decimal,
    pub executed_at: DateTime<Utc>,
}

impl From<&Trade> for TradeEvent {
    fn from(trade: &Trade) -> Self {
        Self {
            trade_id: trade.id,
            symbol: trade.symbol.clone(),
            buy_order_id: trade.buy_order_id,
            sell_order_id: trade.sell_order_id,
            price: trade.price,
            quantity: trade.quantity,
            executed_at: trade.executed_at,
        }
    }
}

/// Durable, ordered publication target for engine-worker output.
///
/// Implementations must preserve submission order: for a given submission,
/// its batched trade event is published before its order event (§4.D).
/// Callers reach this through [`run_publisher`], never from the matching
/// worker directly, since a concrete sink may block on disk or network I/O.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Publishes every fill produced by one submission as a single
    /// `order_matched` event. Never called with an empty slice.
    async fn publish_trades(&self, trades: &[Trade]);
    async fn publish_order_added(&self, order: &Order);

    /// Subscribes to the live event fanout, for the WebSocket handler and
    /// persistence consumers. Returns `None` for sinks that don't support
    /// live fanout (e.g. a pure test double collecting events for assertions).
    fn subscribe(&self) -> Option<tokio::sync::broadcast::Receiver<Event>> {
        None
    }
}

/// In-memory test double: collects published events instead of writing them
/// anywhere, so engine tests can assert on emission order without a broker.
#[derive(Default)]
pub struct ChannelEventSink {
    events: parking_lot::Mutex<Vec<Event>>,
}

impl ChannelEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<Event> {
        std::mem::take(&mut self.events.lock())
    }
}

#[async_trait]
impl EventSink for ChannelEventSink {
    async fn publish_trades(&self, trades: &[Trade]) {
        self.events
            .lock()
            .push(Event::OrderMatched(trades.iter().map(TradeEvent::from).collect()));
    }

    async fn publish_order_added(&self, order: &Order) {
        self.events.lock().push(Event::OrderAdded(order.into()));
    }
}
