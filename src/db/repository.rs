//! SQLite-backed state store.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use super::StateStore;
use crate::errors::AppResult;

/// Key-value records in the `state` table.
#[derive(Clone)]
pub struct SqliteStateStore {
    pool: SqlitePool,
}

impl SqliteStateStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List stored keys, index key included.
    pub async fn keys(&self) -> AppResult<Vec<String>> {
        let rows = sqlx::query("SELECT key FROM state ORDER BY key")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("key")).collect())
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn load(&self, key: &str) -> AppResult<Option<String>> {
        let row = sqlx::query("SELECT value FROM state WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.get("value")))
    }

    async fn save(&self, key: &str, value: String) -> AppResult<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO state (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(&value)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
