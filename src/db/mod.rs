//! Durable key-value storage for project records.
//!
//! The in-memory store is the source of truth while the process runs; this layer only
//! holds an eventually consistent copy. Keys are the project ids plus [`INDEX_KEY`].

mod memory;
mod repository;

pub use memory::*;
pub use repository::*;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use crate::errors::AppResult;

/// Key under which the ordered list of project ids is stored.
pub const INDEX_KEY: &str = "feeds";

/// Asynchronous key-value backend.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Returns the raw value for `key`, or `None` when nothing is stored.
    async fn load(&self, key: &str) -> AppResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn save(&self, key: &str, value: String) -> AppResult<()>;
}

/// Loads and decodes a JSON value.
pub async fn load_json<T: DeserializeOwned>(
    store: &dyn StateStore,
    key: &str,
) -> AppResult<Option<T>> {
    match store.load(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Encodes and stores a JSON value.
pub async fn save_json<T: Serialize + ?Sized>(
    store: &dyn StateStore,
    key: &str,
    value: &T,
) -> AppResult<()> {
    let raw = serde_json::to_string(value)?;
    store.save(key, raw).await
}

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
