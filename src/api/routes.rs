//! HTTP ingress router (§4.H, §6).

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use crate::api::handlers;
use crate::AppState;

pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(handlers::order::create_order))
        .route("/orderbook", get(handlers::book::get_books))
        .route("/orderbook/:symbol", get(handlers::book::get_book))
}
