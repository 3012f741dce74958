//! `POST /orders` (§6): the only write path into the engine. Validation
//! happens in [`crate::engine::Engine::submit`]; this handler only adapts
//! between the wire shape and the engine's own request type.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::error::EngineError;
use crate::models::{CreateOrderRequest, CreateOrderResponse};
use crate::AppState;

/// `202 {orderId}` once the order is enqueued on the matching inbox; the
/// match itself happens asynchronously on the engine worker (§4.D).
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(mut req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CreateOrderResponse>), EngineError> {
    req.symbol = req.symbol.trim().to_uppercase();

    let order_id = state.engine.submit(req).await?;

    Ok((StatusCode::ACCEPTED, Json(CreateOrderResponse { order_id })))
}
