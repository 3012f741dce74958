use axum::routing::get;
use axum::Router;
use std::sync::Arc;

use super::handler::ws_handler;
use crate::AppState;

pub fn create_router() -> Router<Arc<AppState>> {
    Router::new().route("/event", get(ws_handler))
}
