//! SQLite settings implementation.
//!
//! Provides the durable backend the gate's crash-recovery behavior
//! depends on: values written by one invocation are read by the next.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use super::{SettingsError, SettingsStore};

/// SQLite settings backend.
pub struct SqliteSettings {
    pool: SqlitePool,
}

impl SqliteSettings {
    /// Open (or create) the settings database at the given path.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path_str = path.as_ref().to_string_lossy();
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path_str))
            .map_err(|e| SettingsError::Backend(e.to_string()))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| SettingsError::Backend(e.to_string()))?;

        let settings = Self { pool };
        settings.run_migrations().await?;
        Ok(settings)
    }

    /// Create an in-memory SQLite database (useful for testing).
    pub async fn in_memory() -> Result<Self, SettingsError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| SettingsError::Backend(e.to_string()))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| SettingsError::Backend(e.to_string()))?;

        let settings = Self { pool };
        settings.run_migrations().await?;
        Ok(settings)
    }

    /// Bootstrap the schema.
    async fn run_migrations(&self) -> Result<(), SettingsError> {
        let schema = include_str!("../../migrations/001_initial_schema.sql");
        sqlx::raw_sql(schema)
            .execute(&self.pool)
            .await
            .map_err(|e| SettingsError::Backend(format!("migration failed: {}", e)))?;
        Ok(())
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl SettingsStore for SqliteSettings {
    async fn get(&self, scope: &str, key: &str) -> Result<Option<String>, SettingsError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM settings WHERE scope = ? AND key = ?")
                .bind(scope)
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| SettingsError::Backend(e.to_string()))?;
        Ok(row.map(|(value,)| value))
    }

    async fn put(&self, scope: &str, key: &str, value: &str) -> Result<(), SettingsError> {
        sqlx::query(
            r#"
            INSERT INTO settings (scope, key, value) VALUES (?, ?, ?)
            ON CONFLICT (scope, key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(scope)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| SettingsError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn remove(&self, scope: &str, key: &str) -> Result<(), SettingsError> {
        sqlx::query("DELETE FROM settings WHERE scope = ? AND key = ?")
            .bind(scope)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| SettingsError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn keys(&self, scope: &str) -> Result<Vec<String>, SettingsError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT key FROM settings WHERE scope = ?")
            .bind(scope)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SettingsError::Backend(e.to_string()))?;
        Ok(rows.into_iter().map(|(key,)| key).collect())
    }
}
