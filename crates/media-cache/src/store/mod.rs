//! Persistence backends for cached media

mod memory;
mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{CacheError, Result};
use crate::types::CacheEntry;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Asynchronous key-value store for cache entries.
///
/// Every write is a single atomic upsert of one record.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>>;

    /// Insert or overwrite the entry for `entry.key`
    async fn put(&self, entry: &CacheEntry) -> Result<()>;

    /// Remove the entry for `key`; absent keys are not an error
    async fn delete(&self, key: &str) -> Result<()>;

    /// Remove every entry stored at or before `cutoff`, returning how many went
    async fn delete_stored_until(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    async fn count(&self) -> Result<u64>;

    /// Release the underlying handle
    async fn close(&self) {}
}

/// Opens a host-defined store when the cache is first used
#[async_trait]
pub trait StoreFactory: Send + Sync {
    async fn open(&self) -> Result<Arc<dyn MediaStore>>;
}

/// Which store the cache opens on first use
#[derive(Clone)]
pub enum StoreBackend {
    Sqlite { path: PathBuf, max_connections: u32 },
    Memory,
    /// No persistence; the cache runs in passthrough mode
    Disabled,
    /// A store opened by the host
    Provided(Arc<dyn MediaStore>),
    /// A store opened lazily by the host
    Factory(Arc<dyn StoreFactory>),
}

impl StoreBackend {
    pub async fn open(&self) -> Result<Arc<dyn MediaStore>> {
        match self {
            StoreBackend::Sqlite {
                path,
                max_connections,
            } => Ok(Arc::new(SqliteStore::open(path, *max_connections).await?)),
            StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
            StoreBackend::Disabled => Err(CacheError::StoreUnavailable(
                "persistence is disabled".to_string(),
            )),
            StoreBackend::Provided(store) => Ok(store.clone()),
            StoreBackend::Factory(factory) => factory.open().await,
        }
    }
}
