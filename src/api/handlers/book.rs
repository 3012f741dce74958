//! `GET /orderbook` and `GET /orderbook/:symbol` (§6): read-only depth
//! views derived straight from each [`OrderBook`]'s own snapshot, never
//! mutating the engine's book map (the §9 open question on book-existence
//! side effects — resolved by [`crate::engine::Engine::get_book`] already
//! being non-creating).

use axum::extract::{Path, Query, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::engine::BookSnapshot;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DepthQuery {
    depth: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct Level {
    pub price: Decimal,
    pub qty: Decimal,
}

#[derive(Debug, Serialize)]
pub struct Depth {
    pub bids: Vec<Level>,
    pub asks: Vec<Level>,
}

#[derive(Debug, Serialize)]
pub struct SymbolDepth {
    pub symbol: String,
    pub bids: Vec<Level>,
    pub asks: Vec<Level>,
}

fn levels(pairs: Vec<(Decimal, Decimal)>) -> Vec<Level> {
    pairs.into_iter().map(|(price, qty)| Level { price, qty }).collect()
}

fn depth_of(snapshot: BookSnapshot) -> Depth {
    Depth { bids: levels(snapshot.bids), asks: levels(snapshot.asks) }
}

/// `GET /orderbook/:symbol?depth=N`. An unknown symbol is reported as an
/// empty book rather than a 404: the engine creates books lazily on
/// submission, so "no book yet" and "no liquidity" look the same from here.
pub async fn get_book(
    Path(symbol): Path<String>,
    Query(query): Query<DepthQuery>,
    State(state): State<Arc<AppState>>,
) -> Json<SymbolDepth> {
    let symbol = symbol.trim().to_uppercase();
    let depth = query.depth.unwrap_or(state.config.snapshot_depth);

    let Depth { bids, asks } = match state.engine.get_book(&symbol) {
        Some(book) => depth_of(book.snapshot(depth)),
        None => Depth { bids: Vec::new(), asks: Vec::new() },
    };

    Json(SymbolDepth { symbol, bids, asks })
}

/// `GET /orderbook?depth=N`: every symbol the engine has ever seen a
/// submission for.
pub async fn get_books(
    Query(query): Query<DepthQuery>,
    State(state): State<Arc<AppState>>,
) -> Json<BTreeMap<String, Depth>> {
    let depth = query.depth.unwrap_or(state.config.snapshot_depth);

    let mut out = BTreeMap::new();
    for symbol in state.engine.symbols() {
        if let Some(book) = state.engine.get_book(&symbol) {
            out.insert(symbol, depth_of(book.snapshot(depth)));
        }
    }

    Json(out)
}
