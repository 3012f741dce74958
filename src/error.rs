//! Error types for the engine library and the HTTP surface.
//!
//! Library code returns typed [`EngineError`] (§7); `main` and other bootstrap
//! code use `anyhow::Result` where failures are fatal by construction.

use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::Serialize;

/// Errors raised by the matching engine and its adapters.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("symbol must be non-empty")]
    EmptySymbol,

    #[error("price must be non-negative")]
    InvalidPrice,

    #[error("price must be less than 1e9")]
    PriceTooLarge,

    #[error("quantity must be positive")]
    InvalidQuantity,

    #[error("quantity must be less than 1e9")]
    QuantityTooLarge,

    #[error("submission queue is closed")]
    InboxClosed,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("recovered book for {symbol} is crossed: best bid {bid} >= best ask {ask}")]
    CrossedRecovery {
        symbol: String,
        bid: rust_decimal::Decimal,
        ask: rust_decimal::Decimal,
    },
}

impl EngineError {
    fn status(&self) -> StatusCode {
        match self {
            EngineError::EmptySymbol
            | EngineError::InvalidPrice
            | EngineError::PriceTooLarge
            | EngineError::InvalidQuantity
            | EngineError::QuantityTooLarge => StatusCode::BAD_REQUEST,
            EngineError::InboxClosed => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::Database(_) | EngineError::CrossedRecovery { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::warn!(error = %self, %status, "request rejected");
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}
