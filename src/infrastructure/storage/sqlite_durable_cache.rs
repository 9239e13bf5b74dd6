use super::connection_pool::ConnectionPool;
use crate::application::ports::durable_cache::DurableCache;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

/// SQLite に保存する永続キャッシュ
#[derive(Clone)]
pub struct SqliteDurableCache {
    pool: ConnectionPool,
}

impl SqliteDurableCache {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let pool = if database_url.contains(":memory:") {
            ConnectionPool::from_memory().await?
        } else {
            ConnectionPool::new(database_url).await?
        };
        let cache = Self::new(pool);
        cache.initialize().await?;
        Ok(cache)
    }

    pub async fn initialize(&self) -> Result<(), AppError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS interaction_cache (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.get_pool())
        .await?;
        Ok(())
    }
}

#[async_trait]
impl DurableCache for SqliteDurableCache {
    async fn read(&self, key: &str) -> Result<Option<String>, AppError> {
        let row = sqlx::query("SELECT value FROM interaction_cache WHERE key = ?")
            .bind(key)
            .fetch_optional(self.pool.get_pool())
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("value")?)),
            None => Ok(None),
        }
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO interaction_cache (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().timestamp_millis())
        .execute(self.pool.get_pool())
        .await?;
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>, AppError> {
        let rows = sqlx::query("SELECT key FROM interaction_cache ORDER BY key")
            .fetch_all(self.pool.get_pool())
            .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("key").map_err(AppError::from))
            .collect()
    }

    async fn remove_many(&self, keys: &[String]) -> Result<(), AppError> {
        if keys.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.get_pool().begin().await?;
        for key in keys {
            sqlx::query("DELETE FROM interaction_cache WHERE key = ?")
                .bind(key)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
