//! Process bootstrap (§10): loads configuration, connects the database,
//! recovers book state, then wires the matching engine, its event pipeline,
//! and the HTTP/WebSocket adapters together before serving traffic.

mod api;
mod config;
mod db;
mod engine;
mod error;
mod events;
mod models;
mod websocket;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::AppConfig;
use db::Database;
use engine::{recover, run_snapshot_producer, run_worker, Engine, SnapshotMessage};
use events::consumers::{run_order_consumer, run_trade_consumer};
use events::{run_publisher, EventSink, LogEventSink};

/// Depth of the broadcast channel backing the event log's live fanout
/// (§4.C) and the WebSocket snapshot fanout (§4.E) — enough to absorb a
/// burst without a slow subscriber stalling the publisher.
const FANOUT_CAPACITY: usize = 1024;

pub struct AppState {
    pub engine: Arc<Engine>,
    pub config: AppConfig,
    pub snapshot_tx: broadcast::Sender<SnapshotMessage>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "matchbook=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = AppConfig::load()?;
    tracing::info!(http_port = config.http_port, "starting matchbook");

    let db = Database::connect(&config.database_url).await?;
    tracing::info!("database connected");

    let (engine, inbox) = Engine::new(config.inbox_capacity);

    // Recovery must complete before the worker starts draining the inbox
    // (§4.F): `Engine::restore` bypasses matching entirely and would race
    // with live submissions otherwise.
    recover(&engine, &db).await?;

    let engine = Arc::new(engine);
    let sink: Arc<dyn EventSink> = Arc::new(LogEventSink::open(&config.event_log_path, FANOUT_CAPACITY).await?);
    let cancel = CancellationToken::new();

    // The matching worker only ever enqueues onto `publish_tx`; `run_publisher`
    // is the sole caller of the sink's `publish_*` methods, keeping disk/broker
    // latency off the matching hot path (§4.D, §5).
    let (publish_tx, publish_rx) = tokio::sync::mpsc::unbounded_channel();
    tokio::spawn(run_publisher(sink.clone(), publish_rx, cancel.clone()));
    tokio::spawn(run_worker(engine.books(), inbox, publish_tx, cancel.clone()));

    // Two independent consumer groups (§4.G): a stall persisting one kind of
    // event never blocks the other, since each subscribes separately.
    if let Some(events) = sink.subscribe() {
        tokio::spawn(run_order_consumer(events, db.clone(), cancel.clone()));
    }
    if let Some(events) = sink.subscribe() {
        tokio::spawn(run_trade_consumer(events, db.clone(), cancel.clone()));
    }

    let (snapshot_tx, _) = broadcast::channel::<SnapshotMessage>(FANOUT_CAPACITY);
    tokio::spawn(run_snapshot_producer(
        engine.clone(),
        snapshot_tx.clone(),
        Duration::from_millis(config.snapshot_interval_ms),
        config.snapshot_depth,
        cancel.clone(),
    ));

    let state = Arc::new(AppState { engine, config: config.clone(), snapshot_tx });

    let app = Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(api::routes::create_router())
        .merge(websocket::routes::create_router())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

/// Waits for `SIGINT`/`SIGTERM`, then fires `cancel` so the matching worker,
/// the snapshot producer, and the persistence consumer all stop on their
/// next loop iteration (§5) before axum finishes draining in-flight requests.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown signal received");
    cancel.cancel();
}
