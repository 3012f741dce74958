//! Boot-time recovery (§4.F): reconstructs every symbol's resting orders
//! from the `orders`/`trades` tables before the matching worker starts
//! draining new submissions, the same join and sort the source performs in
//! `RetrieveOrderBooks` before replaying into fresh in-memory books.

use super::engine::Engine;
use crate::db::Database;
use crate::error::EngineError;
use crate::models::Order;

/// Loads every order with positive remaining quantity and replays it onto
/// `engine`'s books in price-time priority order. Must run before
/// [`super::engine::run_worker`] starts, since [`Engine::restore`] bypasses
/// the inbox entirely.
///
/// Fails loudly if the reconstructed state for any symbol is crossed: that
/// can only mean the persisted history itself is inconsistent, and starting
/// the engine against it would risk matching at a stale or wrong price.
pub async fn recover(engine: &Engine, db: &Database) -> Result<(), EngineError> {
    let rows = db.fetch_recovery_rows().await?;
    let mut restored = 0usize;

    for row in rows {
        let symbol = row.symbol.clone();
        let order: Order = row.into();
        engine.restore(&symbol, order);
        restored += 1;
    }

    for symbol in engine.symbols() {
        let Some(book) = engine.get_book(&symbol) else { continue };
        if book.is_crossed() {
            let bid = book.best_bid().expect("crossed implies both sides present");
            let ask = book.best_ask().expect("crossed implies both sides present");
            return Err(EngineError::CrossedRecovery { symbol, bid, ask });
        }
    }

    tracing::info!(restored, symbols = engine.symbols().len(), "recovery complete");
    Ok(())
}
