//! Periodic book snapshot broadcast (§4.E).
//!
//! Every tick, packages the top of every symbol's book into one payload and
//! hands it to the WebSocket broadcast sender, mirroring the source's
//! `StartWsSnapshotWorker` (2 second ticker, depth 10, `{type, payload}`
//! envelope keyed by symbol).

use super::engine::Engine;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotMessage {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub payload: BTreeMap<String, SymbolSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolSnapshot {
    pub bids: Vec<(Decimal, Decimal)>,
    pub asks: Vec<(Decimal, Decimal)>,
}

/// Runs until `cancel` fires. `tx` is the WebSocket fanout; a send error
/// just means no client is currently connected and is not logged per-tick.
pub async fn run_snapshot_producer(
    engine: Arc<Engine>,
    tx: broadcast::Sender<SnapshotMessage>,
    interval: Duration,
    depth: usize,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("snapshot producer shutting down");
                return;
            }
            _ = ticker.tick() => {
                let mut payload = BTreeMap::new();
                for symbol in engine.symbols() {
                    let Some(book) = engine.get_book(&symbol) else { continue };
                    let snapshot = book.snapshot(depth);
                    payload.insert(symbol, SymbolSnapshot { bids: snapshot.bids, asks: snapshot.asks });
                }

                let _ = tx.send(SnapshotMessage { kind: "snapshot", payload });
            }
        }
    }
}
