//! PostgreSQL blob store implementation.
//!
//! One JSONB row per key. `Strong` and `Eventual` reads are identical here;
//! the distinction exists for stores with weaker default semantics.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use crate::kernel::traits::{BaseBlobStore, ReadConsistency};

pub struct PostgresBlobStore {
    pool: PgPool,
}

impl PostgresBlobStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("Failed to connect to Postgres")?;
        let store = Self::from_pool(pool);
        store.run_migrations().await?;
        Ok(store)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS blobs (
                key TEXT PRIMARY KEY,
                value JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create blobs table")?;
        Ok(())
    }
}

#[async_trait]
impl BaseBlobStore for PostgresBlobStore {
    async fn get(
        &self,
        key: &str,
        _consistency: ReadConsistency,
    ) -> Result<Option<serde_json::Value>> {
        let row = sqlx::query("SELECT value FROM blobs WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .context("blob get failed")?;
        Ok(row.map(|r| r.get::<serde_json::Value, _>("value")))
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()> {
        sqlx::query(
            "INSERT INTO blobs (key, value, updated_at) VALUES ($1, $2, NOW())
             ON CONFLICT (key) DO UPDATE SET value = $2, updated_at = NOW()",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .context("blob set failed")?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM blobs WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .context("blob delete failed")?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT key FROM blobs WHERE key LIKE $1 || '%' ORDER BY key")
            .bind(prefix)
            .fetch_all(&self.pool)
            .await
            .context("blob list failed")?;
        Ok(rows.into_iter().map(|r| r.get::<String, _>("key")).collect())
    }
}
