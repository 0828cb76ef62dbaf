//! On-device media cache
//!
//! Stores fetched remote media as binary blobs keyed by locator, serves
//! cached copies before re-fetching, expires entries by age, and converts
//! cached content into self-contained `data:` URIs for outbound model
//! requests.
//!
//! The persistence backend is opened lazily on first use and shared by all
//! callers. When no backend can be opened the cache degrades to passthrough
//! mode instead of failing.

mod cache;
mod clock;
mod config;
mod data_uri;
mod error;
mod fetcher;
mod locator;
pub mod store;
mod types;

pub use cache::MediaCache;
pub use clock::{Clock, SystemClock};
pub use config::{BackendKind, CacheConfig};
pub use data_uri::{normalize_mime, EmbeddedDataUri};
pub use error::{CacheError, FetchError, Result};
pub use fetcher::{Fetcher, HttpFetcher};
pub use locator::{Locator, LocatorKind};
pub use store::{MediaStore, MemoryStore, SqliteStore, StoreBackend, StoreFactory};
pub use types::{CacheEntry, CacheStats, FetchedMedia, LocalReference, MediaRef};
