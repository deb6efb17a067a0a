//! Key-Value Storage using SQLite

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::KeyValueStore,
};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    Row,
};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error};

/// SQLite result code for `SQLITE_FULL`.
const SQLITE_FULL: &str = "13";

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS kv_store (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at INTEGER NOT NULL
    )
"#;

/// SQLite-backed key-value store implementation
///
/// Provides persistent key-value storage using SQLite:
/// - Whole-value upserts, atomic per key
/// - Keys enumerated in first-insertion order
/// - Async operations
pub struct SqliteKeyValueStore {
    pool: SqlitePool,
}

impl SqliteKeyValueStore {
    /// Create a new store backed by the database file at `db_path`
    pub async fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(BridgeError::Io)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to connect to DB: {}", e)))?;

        Self::create_table(&pool).await?;

        debug!(path = ?db_path, "Initialized key-value store");

        Ok(Self { pool })
    }

    /// Create an in-memory store (for testing and ephemeral sessions)
    ///
    /// The pool is pinned to a single connection because every SQLite
    /// in-memory connection owns a separate database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to connect to DB: {}", e)))?;

        Self::create_table(&pool).await?;

        Ok(Self { pool })
    }

    async fn create_table(pool: &SqlitePool) -> Result<()> {
        sqlx::query(CREATE_TABLE)
            .execute(pool)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to create table: {}", e)))?;
        Ok(())
    }

    /// Get the current Unix timestamp
    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default()
    }
}

/// Translate a failed write into a bridge error, surfacing a full disk as
/// `QuotaExceeded` so callers can tell it apart from other I/O failures.
fn map_write_error(key: &str, err: sqlx::Error) -> BridgeError {
    let is_full = err
        .as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == SQLITE_FULL);

    if is_full {
        BridgeError::QuotaExceeded {
            key: key.to_string(),
        }
    } else {
        BridgeError::DatabaseError(format!("Failed to write '{}': {}", key, err))
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!(key = key, error = %e, "Failed to read key");
                BridgeError::DatabaseError(format!("Failed to read '{}': {}", key, e))
            })?;

        Ok(row.map(|row| row.get(0)))
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Self::now())
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(key, e))?;

        debug!(key = key, bytes = value.len(), "Stored value");
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to remove '{}': {}", key, e)))?;

        debug!(key = key, "Removed key");
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT key FROM kv_store ORDER BY rowid")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to list keys: {}", e)))?;

        let keys = rows.into_iter().map(|row| row.get(0)).collect();
        Ok(keys)
    }

    async fn has_key(&self, key: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to check key: {}", e)))?;

        Ok(row.is_some())
    }
}
