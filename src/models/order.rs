//! Order domain type and wire DTOs.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_side", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// An order as it moves through ingress, the engine, and the event log.
///
/// `price == Decimal::ZERO` denotes a market order (never rests, §4.B).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub symbol: String,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
    pub remaining: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn is_market(&self) -> bool {
        self.price.is_zero()
    }

    pub fn is_limit(&self) -> bool {
        !self.is_market()
    }
}

/// `POST /orders` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub symbol: String,
    pub side: Side,
    /// `0` (or omitted) submits a market order.
    #[serde(default)]
    pub price: Decimal,
    pub quantity: Decimal,
}

/// `POST /orders` response body.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderResponse {
    #[serde(rename = "orderId")]
    pub order_id: Uuid,
}
