//! Relational persistence (§4.G).
//!
//! A thin wrapper around a [`sqlx::PgPool`], following the teacher's split of
//! "one struct owns the pool, submodules hold the queries" without the
//! `query!` compile-time macro (there is no live database at build time
//! here, same as the teacher's own non-macro `sqlx::query`/`query_as` calls).

pub mod persistence;

pub use persistence::RecoveredOrder;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        let db = Self { pool };
        db.ensure_schema().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the `orders`/`trades` tables and the `order_side` enum if
    /// they don't already exist. There is no separate migration tool in this
    /// deployment; the schema is small and stable enough to bootstrap inline.
    async fn ensure_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            DO $$ BEGIN
                CREATE TYPE order_side AS ENUM ('buy', 'sell');
            EXCEPTION WHEN duplicate_object THEN NULL;
            END $$;
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS orders (
                id UUID PRIMARY KEY,
                symbol TEXT NOT NULL,
                side order_side NOT NULL,
                price NUMERIC NOT NULL,
                quantity NUMERIC NOT NULL,
                remaining NUMERIC NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_orders_symbol ON orders (symbol)")
            .execute(&self.pool)
            .await?;

        // No foreign key to `orders`: a fully-filled taker or a market order
        // never gets an `order_added` event, so its row in `orders` may never
        // exist even though it legitimately appears as a trade counterparty.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trades (
                id UUID PRIMARY KEY,
                symbol TEXT NOT NULL,
                buy_order_id UUID NOT NULL,
                sell_order_id UUID NOT NULL,
                price NUMERIC NOT NULL,
                quantity NUMERIC NOT NULL,
                executed_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_trades_buy_order ON trades (buy_order_id)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_trades_sell_order ON trades (sell_order_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
