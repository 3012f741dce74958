//! Decouples the matching worker from publish latency (§4.D, §5).
//!
//! [`LogEventSink::append`] synchronously locks a file mutex and flushes to
//! disk; the matching worker must never `.await` that directly on its hot
//! path, or a slow disk stalls matching for every symbol. `run_worker` hands
//! each submission's output to this queue instead, and this task is the only
//! caller of the sink's `publish_*` methods.

use super::EventSink;
use crate::models::{Order, Trade};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One submission's worth of output, queued for the publisher task. The
/// sender (`tokio::sync::mpsc::UnboundedSender`) never blocks, so the
/// matching worker's hand-off is always a plain, synchronous push.
pub enum PublishJob {
    Trades(Vec<Trade>),
    OrderAdded(Order),
}

/// Drains the publish queue and forwards each job to the sink, one at a
/// time, preserving the order the matching worker enqueued them in. Stops on
/// cancellation or once every sender has dropped.
pub async fn run_publisher(
    sink: Arc<dyn EventSink>,
    mut queue: mpsc::UnboundedReceiver<PublishJob>,
    cancel: CancellationToken,
) {
    loop {
        let job = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("event publisher shutting down");
                return;
            }
            received = queue.recv() => match received {
                Some(job) => job,
                None => {
                    tracing::info!("publish queue closed, event publisher exiting");
                    return;
                }
            },
        };

        match job {
            PublishJob::Trades(trades) => sink.publish_trades(&trades).await,
            PublishJob::OrderAdded(order) => sink.publish_order_added(&order).await,
        }
    }
}
