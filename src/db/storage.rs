//! Key/value access to the local storage table.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::errors::ClientError;

/// Local storage handle.
#[derive(Clone)]
pub struct LocalStorage {
    pool: SqlitePool,
}

impl LocalStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Read a single value.
    pub async fn get_item(&self, key: &str) -> Result<Option<String>, ClientError> {
        let row = sqlx::query("SELECT value FROM local_storage WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        let value = row.map(|r| r.try_get::<String, _>("value")).transpose()?;
        Ok(value)
    }

    /// Write several values atomically; existing keys are overwritten.
    pub async fn set_items(&self, items: &[(&str, &str)]) -> Result<(), ClientError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        for (key, value) in items {
            sqlx::query(
                "INSERT INTO local_storage (key, value, updated_at) VALUES (?, ?, ?) \
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            )
            .bind(key)
            .bind(value)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Remove keys. Missing keys are not an error.
    pub async fn remove_items(&self, keys: &[&str]) -> Result<(), ClientError> {
        let mut tx = self.pool.begin().await?;

        for key in keys {
            sqlx::query("DELETE FROM local_storage WHERE key = ?")
                .bind(key)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_storage;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_set_get_remove() {
        let dir = TempDir::new().unwrap();
        let pool = init_storage(&dir.path().join("local.sqlite")).await.unwrap();
        let storage = LocalStorage::new(pool);

        assert_eq!(storage.get_item("user").await.unwrap(), None);

        storage
            .set_items(&[("user", "{}"), ("token", "abc")])
            .await
            .unwrap();
        assert_eq!(storage.get_item("token").await.unwrap().as_deref(), Some("abc"));

        storage.set_items(&[("token", "def")]).await.unwrap();
        assert_eq!(storage.get_item("token").await.unwrap().as_deref(), Some("def"));

        storage.remove_items(&["user", "token"]).await.unwrap();
        storage.remove_items(&["user", "token"]).await.unwrap();
        assert_eq!(storage.get_item("user").await.unwrap(), None);
        assert_eq!(storage.get_item("token").await.unwrap(), None);
    }
}
