//! Postgres-backed implementation of the key-value store.
//!
//! # What this module is
//! A durable [`KvStore`] over a single `kv_store(key TEXT PRIMARY KEY, value
//! JSONB)` table, shared by every instance of the service.
//!
//! # Key invariants
//! - `set` is an upsert; the row for a key always holds the latest value.
//! - Prefix scans use `starts_with(key, $1)` rather than `LIKE`, because the
//!   entity prefixes contain `_`, which `LIKE` treats as a wildcard.
//!
//! # Operational notes
//! - Migrations run at connect time via `sqlx::migrate!("./migrations")`, so
//!   handlers can assume the table exists.
//! - Database URLs may contain credentials; they are never logged.
use super::{KvStore, StoreError, StoreResult};
use crate::config::PostgresConfig;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::str::FromStr;
use std::time::Duration;

/// Durable key-value store backed by Postgres.
///
/// # Example
/// ```rust,no_run
/// use practice::config::PostgresConfig;
/// use practice::store::postgres::PostgresKvStore;
///
/// async fn open(pg: PostgresConfig) {
///     let _ = PostgresKvStore::connect(&pg).await;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct PostgresKvStore {
    pool: PgPool,
}

impl PostgresKvStore {
    /// Connect, size the pool from `pg`, and apply pending migrations.
    ///
    /// # Errors
    /// - Invalid URL, connection or migration failures.
    pub async fn connect(pg: &PostgresConfig) -> StoreResult<Self> {
        let connect_options = PgConnectOptions::from_str(&pg.url)?;
        let pool = PgPoolOptions::new()
            .max_connections(pg.max_connections)
            .acquire_timeout(Duration::from_millis(pg.acquire_timeout_ms))
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|err| StoreError::Unexpected(anyhow::Error::new(err)))?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool. The schema must already be migrated.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unexpected(anyhow::Error::new(err))
    }
}

#[async_trait]
impl KvStore for PostgresKvStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        let value = sqlx::query_scalar::<_, Value>("SELECT value FROM kv_store WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO kv_store (key, value, updated_at) VALUES ($1, $2, now()) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM kv_store WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn scan_prefix(&self, prefix: &str) -> StoreResult<Vec<Value>> {
        let values = sqlx::query_scalar::<_, Value>(
            "SELECT value FROM kv_store WHERE starts_with(key, $1) ORDER BY key",
        )
        .bind(prefix)
        .fetch_all(&self.pool)
        .await?;
        Ok(values)
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
