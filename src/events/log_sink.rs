//! Append-only ndjson event log with a broadcast fanout (§4.C).
//!
//! Stands in for the source's partitioned Kafka topic: one line per event,
//! flushed immediately so a crash between write and the next submission
//! never loses an acknowledged event, and a [`broadcast`] channel so the
//! WebSocket handler and the persistence consumers each see every event
//! without coordinating with one another.

use super::{Event, EventSink, TradeEvent};
use crate::models::{Order, Trade};
use async_trait::async_trait;
use std::path::Path;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::{broadcast, Mutex};

pub struct LogEventSink {
    file: Mutex<tokio::fs::File>,
    tx: broadcast::Sender<Event>,
}

impl LogEventSink {
    pub async fn open(path: impl AsRef<Path>, fanout_capacity: usize) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path).await?;
        let (tx, _rx) = broadcast::channel(fanout_capacity);
        Ok(Self { file: Mutex::new(file), tx })
    }

    async fn append(&self, event: Event) {
        let line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(err) => {
                tracing::error!(%err, "failed to serialize event, dropping");
                return;
            }
        };

        {
            let mut file = self.file.lock().await;
            if let Err(err) = file.write_all(line.as_bytes()).await {
                tracing::error!(%err, "failed to append event to log");
            } else if let Err(err) = file.write_all(b"\n").await {
                tracing::error!(%err, "failed to append event newline");
            } else if let Err(err) = file.flush().await {
                tracing::error!(%err, "failed to flush event log");
            }
        }

        // No subscribers is the common case when no WebSocket client is
        // connected yet; the log write above is what makes the event durable.
        let _ = self.tx.send(event);
    }
}

#[async_trait]
impl EventSink for LogEventSink {
    async fn publish_trades(&self, trades: &[Trade]) {
        self.append(Event::OrderMatched(trades.iter().map(TradeEvent::from).collect())).await;
    }

    async fn publish_order_added(&self, order: &Order) {
        self.append(Event::OrderAdded(order.into())).await;
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<Event>> {
        Some(self.tx.subscribe())
    }
}
