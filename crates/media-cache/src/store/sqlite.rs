//! SQLite-backed media store

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info};

use super::MediaStore;
use crate::error::{CacheError, Result};
use crate::types::CacheEntry;

#[derive(sqlx::FromRow)]
struct EntryRow {
    key: String,
    content: Vec<u8>,
    content_type: String,
    stored_at: i64,
    context: Option<String>,
}

impl TryFrom<EntryRow> for CacheEntry {
    type Error = CacheError;

    fn try_from(row: EntryRow) -> Result<Self> {
        let stored_at = DateTime::from_timestamp_millis(row.stored_at).ok_or_else(|| {
            CacheError::Read(format!("invalid stored_at {} for {}", row.stored_at, row.key))
        })?;
        Ok(CacheEntry {
            key: row.key,
            content: Bytes::from(row.content),
            content_type: row.content_type,
            stored_at,
            context: row.context,
        })
    }
}

/// Persistent store in a single SQLite database file
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `path` and bring its schema
    /// up to date
    pub async fn open(path: &Path, max_connections: u32) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                CacheError::StoreUnavailable(format!(
                    "cannot create {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| {
                CacheError::StoreUnavailable(format!("cannot open {}: {e}", path.display()))
            })?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        info!(path = %path.display(), "Media store opened");
        Ok(Self { pool })
    }
}

#[async_trait]
impl MediaStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let row = sqlx::query_as::<_, EntryRow>(
            r#"
            SELECT key, content, content_type, stored_at, context
            FROM media_entries
            WHERE key = ?1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CacheError::Read(e.to_string()))?;

        row.map(CacheEntry::try_from).transpose()
    }

    async fn put(&self, entry: &CacheEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO media_entries (key, content, content_type, stored_at, context)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (key) DO UPDATE SET
                content = excluded.content,
                content_type = excluded.content_type,
                stored_at = excluded.stored_at,
                context = excluded.context
            "#,
        )
        .bind(&entry.key)
        .bind(entry.content.as_ref())
        .bind(&entry.content_type)
        .bind(entry.stored_at.timestamp_millis())
        .bind(entry.context.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| CacheError::Write(e.to_string()))?;

        debug!(key = %entry.key, size = entry.content.len(), "Stored media entry");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM media_entries WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| CacheError::Write(e.to_string()))?;
        Ok(())
    }

    async fn delete_stored_until(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM media_entries WHERE stored_at <= ?1")
            .bind(cutoff.timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(|e| CacheError::Write(e.to_string()))?;
        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM media_entries")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| CacheError::Read(e.to_string()))?;
        Ok(count.max(0) as u64)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
