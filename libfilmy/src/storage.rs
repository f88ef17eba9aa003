//! Snapshot persistence
//!
//! The store is persisted as one JSON document under [`SNAPSHOT_KEY`] in a
//! small key-value table and rehydrated at start.

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use crate::error::StorageError;
use crate::store::Snapshot;

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Key the root snapshot is stored under
pub const SNAPSHOT_KEY: &str = "persist:root";

/// Key-value collaborator holding serialized state
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    async fn load_snapshot(&self) -> StorageResult<Option<Snapshot>> {
        match self.get(SNAPSHOT_KEY).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save_snapshot(&self, snapshot: &Snapshot) -> StorageResult<()> {
        let json = serde_json::to_string(snapshot)?;
        self.set(SNAPSHOT_KEY, &json).await
    }
}

/// SQLite-backed snapshot store
#[derive(Clone)]
pub struct SqliteSnapshotStore {
    pool: SqlitePool,
}

impl SqliteSnapshotStore {
    /// Open (creating if needed) the database at `db_path` and migrate it
    pub async fn open(db_path: &str) -> StorageResult<Self> {
        let expanded_path = shellexpand::tilde(db_path).to_string();
        let path = Path::new(&expanded_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // mode=rwc creates the file on first use
        let db_url = format!("sqlite://{}?mode=rwc", expanded_path.replace('\\', "/"));
        let pool = SqlitePool::connect(&db_url).await?;
        Self::with_pool(pool).await
    }

    /// Private database that lives as long as the store
    pub async fn in_memory() -> StorageResult<Self> {
        // Each connection to :memory: is a separate database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> StorageResult<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let row = sqlx::query("SELECT value FROM snapshots WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get::<String, _>("value")))
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO snapshots (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        debug!("Persisted {} ({} bytes)", key, value.len());
        Ok(())
    }
}

/// Process-local snapshot store
#[derive(Clone, Default)]
pub struct MemorySnapshotStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::state::SNAPSHOT_VERSION;
    use crate::types::User;
    use tempfile::TempDir;

    fn snapshot(token: &str) -> Snapshot {
        Snapshot {
            version: SNAPSHOT_VERSION,
            user: Some(User {
                id: "u1".to_string(),
                full_name: "Ada Lovelace".to_string(),
                email: "ada@example.com".to_string(),
                token: token.to_string(),
                favorites: vec!["m1".to_string()],
            }),
            movies: vec![],
            favorites: vec![],
            reviews_by_movie: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_sqlite_snapshot_overwrite() {
        let store = SqliteSnapshotStore::in_memory().await.unwrap();
        assert!(store.load_snapshot().await.unwrap().is_none());

        store.save_snapshot(&snapshot("first")).await.unwrap();
        store.save_snapshot(&snapshot("second")).await.unwrap();

        let loaded = store.load_snapshot().await.unwrap().unwrap();
        assert_eq!(loaded.token(), Some("second"));
    }

    #[tokio::test]
    async fn test_sqlite_file_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.db");
        let path = path.to_str().unwrap();

        let store = SqliteSnapshotStore::open(path).await.unwrap();
        store.save_snapshot(&snapshot("jwt")).await.unwrap();
        drop(store);

        let reopened = SqliteSnapshotStore::open(path).await.unwrap();
        let loaded = reopened.load_snapshot().await.unwrap().unwrap();
        assert_eq!(loaded.user.unwrap().favorites, vec!["m1"]);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_an_error() {
        let store = MemorySnapshotStore::new();
        store.set(SNAPSHOT_KEY, "{not json").await.unwrap();
        assert!(matches!(
            store.load_snapshot().await,
            Err(StorageError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemorySnapshotStore::new();
        store.save_snapshot(&snapshot("jwt")).await.unwrap();
        let clone = store.clone();
        assert_eq!(
            clone.load_snapshot().await.unwrap().unwrap().token(),
            Some("jwt")
        );
    }
}
