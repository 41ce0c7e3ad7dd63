//! Database abstraction over SQLite via sqlx.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::error::StoreError;

/// Central store handle.  Cheap to clone (pool is Arc internally).
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (or create) the SQLite database at `db_path`.
    /// Runs all pending migrations automatically.
    ///
    /// WAL journal mode is configured at connection time, not inside a
    /// migration — SQLite forbids changing `journal_mode` inside a
    /// transaction and sqlx wraps every migration in one.
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePool::connect_with(opts).await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    /// In-memory store, used by tests.  A single connection keeps every
    /// query on the same in-memory database.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    async fn migrate(pool: &SqlitePool) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))
    }

    // ── Key-value helpers ────────────────────────────────────────────────────

    pub async fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = sqlx::query_scalar("SELECT v FROM kv WHERE k = ? LIMIT 1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    /// Last-write-wins upsert.  Writing the same value twice is a no-op
    /// apart from the timestamp.
    pub async fn kv_put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO kv (k, v, updated_at) VALUES (?, ?, datetime('now'))
             ON CONFLICT(k) DO UPDATE SET v = excluded.v, updated_at = datetime('now')",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Store;
    use std::path::PathBuf;
    use uuid::Uuid;

    #[tokio::test]
    async fn kv_put_get_overwrite() {
        let store = Store::open_in_memory().await.expect("open store");

        assert_eq!(store.kv_get("missing").await.unwrap(), None);

        store.kv_put("k1", "v1").await.unwrap();
        assert_eq!(store.kv_get("k1").await.unwrap().as_deref(), Some("v1"));

        store.kv_put("k1", "v2").await.unwrap();
        assert_eq!(store.kv_get("k1").await.unwrap().as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn values_survive_reopen() {
        let db_path = PathBuf::from(format!("/tmp/cc-store-test-{}.db", Uuid::new_v4()));

        {
            let store = Store::open(&db_path).await.expect("open store");
            store.kv_put("persist", "yes").await.unwrap();
        }

        let store = Store::open(&db_path).await.expect("reopen store");
        assert_eq!(store.kv_get("persist").await.unwrap().as_deref(), Some("yes"));

        let _ = std::fs::remove_file(&db_path);
        let _ = std::fs::remove_file(db_path.with_extension("db-wal"));
        let _ = std::fs::remove_file(db_path.with_extension("db-shm"));
    }
}
