//! Fetch-or-serve media cache over a lazily opened store

use chrono::TimeDelta;
use moka::future::Cache;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{CacheConfig, DEFAULT_TTL_SECS};
use crate::data_uri::EmbeddedDataUri;
use crate::error::{CacheError, FetchError, Result};
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::locator::{Locator, LocatorKind};
use crate::store::{MediaStore, StoreBackend};
use crate::types::{CacheEntry, CacheStats, FetchedMedia, LocalReference, MediaRef};

const MAX_TTL_SECS: u64 = 100 * 365 * 24 * 60 * 60;
const IN_FLIGHT_TTL_SECS: u64 = 30;
const IN_FLIGHT_CAPACITY: u64 = 1_000;

/// Media cache keyed by locator.
///
/// Construct one at application start, share it (e.g. behind an `Arc`) with
/// every consumer, and call [`MediaCache::close`] at shutdown.
pub struct MediaCache {
    backend: StoreBackend,
    /// `None` once opening failed: the cache then stays in passthrough mode
    store: OnceCell<Option<Arc<dyn MediaStore>>>,
    fetcher: Arc<dyn Fetcher>,
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
    /// Coalesces concurrent fetches of the same locator
    in_flight: Cache<String, Arc<FetchedMedia>>,
    /// Bumped by every removal; a fetch started under an older epoch is not stored
    removal_epoch: Arc<AtomicU64>,
    /// Writers of fetched media share it, removals take it exclusively
    write_gate: Arc<RwLock<()>>,
    hits: AtomicU64,
    misses: AtomicU64,
    fetch_failures: AtomicU64,
}

impl MediaCache {
    /// Create a cache; the store is not opened until first use
    pub fn new(backend: StoreBackend, fetcher: Arc<dyn Fetcher>) -> Self {
        let in_flight = Cache::builder()
            .max_capacity(IN_FLIGHT_CAPACITY)
            .time_to_live(Duration::from_secs(IN_FLIGHT_TTL_SECS))
            .build();

        Self {
            backend,
            store: OnceCell::new(),
            fetcher,
            clock: Arc::new(SystemClock),
            ttl: ttl_from_duration(Duration::from_secs(DEFAULT_TTL_SECS)),
            in_flight,
            removal_epoch: Arc::new(AtomicU64::new(0)),
            write_gate: Arc::new(RwLock::new(())),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            fetch_failures: AtomicU64::new(0),
        }
    }

    /// Create a cache with an HTTP fetcher from configuration
    pub fn from_config(config: &CacheConfig) -> Self {
        let fetcher = HttpFetcher::new(Duration::from_secs(config.fetch_timeout_secs));
        Self::new(config.store_backend(), Arc::new(fetcher))
            .with_ttl(Duration::from_secs(config.ttl_secs))
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl_from_duration(ttl);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Open the store once; concurrent first callers await the same open
    async fn store(&self) -> Option<&Arc<dyn MediaStore>> {
        self.store
            .get_or_init(|| async {
                match self.backend.open().await {
                    Ok(store) => Some(store),
                    Err(e) => {
                        warn!(error = %e, "Media store unavailable, caching disabled");
                        None
                    }
                }
            })
            .await
            .as_ref()
    }

    /// Whether a persistent store backs this cache
    pub async fn is_store_available(&self) -> bool {
        self.store().await.is_some()
    }

    /// Return a displayable reference for `locator`.
    ///
    /// Local and embedded locators come back unchanged without touching the
    /// store. Remote locators are served from the store when fresh, fetched
    /// and stored otherwise. Never fails: on any error the original locator
    /// is returned.
    pub async fn fetch_or_serve(&self, locator: &str) -> MediaRef {
        self.fetch_or_serve_with_context(locator, None).await
    }

    /// Like [`fetch_or_serve`](Self::fetch_or_serve), tagging a newly stored
    /// entry with `context` (e.g. the originating message id).
    ///
    /// When this call joins a fetch already in flight for the same locator,
    /// the entry keeps the context of the call that started the fetch.
    pub async fn fetch_or_serve_with_context(
        &self,
        locator: &str,
        context: Option<&str>,
    ) -> MediaRef {
        let parsed = match Locator::parse(locator) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(error = %e, "Returning locator unchanged");
                return MediaRef::Passthrough(locator.to_string());
            }
        };
        if !parsed.is_remote() {
            return MediaRef::Passthrough(locator.to_string());
        }

        let Some(store) = self.store().await else {
            return MediaRef::Passthrough(locator.to_string());
        };

        match self.resolve(store, locator, context).await {
            Ok((media, from_cache)) => {
                MediaRef::Local(LocalReference::mint(&media, from_cache))
            }
            Err(e) => {
                warn!(locator = %locator, error = %e, "Serving original locator");
                MediaRef::Passthrough(locator.to_string())
            }
        }
    }

    /// Resolve `locator` to a self-contained `data:` URI.
    ///
    /// Uses the same hit/miss/expiry rules as `fetch_or_serve` but surfaces
    /// fetch and conversion errors to the caller. Without a store the content
    /// is fetched directly and not cached.
    pub async fn url_to_embedded(&self, locator: &str) -> Result<EmbeddedDataUri> {
        let parsed = Locator::parse(locator)?;
        match parsed.kind() {
            LocatorKind::Embedded => return EmbeddedDataUri::parse(locator),
            LocatorKind::LocalReference => {
                return Err(CacheError::ConversionFailure(
                    "local references cannot be fetched; use LocalReference::to_data_uri"
                        .to_string(),
                ))
            }
            LocatorKind::Remote => {}
        }

        let media = match self.store().await {
            Some(store) => self.resolve(store, locator, None).await?.0,
            None => Arc::new(self.fetch_uncached(locator).await?),
        };

        EmbeddedDataUri::encode(&media.content_type, &media.content)
    }

    /// Delete the entry for `locator`, if any.
    ///
    /// A fetch of `locator` already in flight still answers its callers but
    /// does not store its result.
    pub async fn remove_entry(&self, locator: &str) {
        self.in_flight.invalidate(locator).await;

        let Some(store) = self.store().await else {
            return;
        };
        let _gate = self.write_gate.write().await;
        self.removal_epoch.fetch_add(1, Ordering::SeqCst);
        match store.delete(locator).await {
            Ok(()) => debug!(key = %locator, "Removed media entry"),
            Err(e) => warn!(key = %locator, error = %e, "Failed to remove media entry"),
        }
    }

    /// Delete every expired entry, returning how many were removed
    pub async fn sweep_expired(&self) -> u64 {
        let Some(store) = self.store().await else {
            return 0;
        };

        let cutoff = self.clock.now() - self.ttl;
        match store.delete_stored_until(cutoff).await {
            Ok(removed) => {
                if removed > 0 {
                    info!(removed, "Swept expired media entries");
                } else {
                    debug!("No expired media entries");
                }
                removed
            }
            Err(e) => {
                warn!(error = %e, "Expiry sweep failed");
                0
            }
        }
    }

    /// Number of stored entries; 0 when the store is unavailable or unreadable
    pub async fn entry_count(&self) -> u64 {
        let Some(store) = self.store().await else {
            return 0;
        };
        store.count().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to count media entries");
            0
        })
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entry_count().await,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            store_available: self.is_store_available().await,
        }
    }

    /// Release the store handle. Does nothing if the store was never opened.
    pub async fn close(&self) {
        if let Some(Some(store)) = self.store.get() {
            store.close().await;
            info!("Media store closed");
        }
    }

    async fn resolve(
        &self,
        store: &Arc<dyn MediaStore>,
        key: &str,
        context: Option<&str>,
    ) -> Result<(Arc<FetchedMedia>, bool)> {
        let now = self.clock.now();

        match store.get(key).await {
            Ok(Some(entry)) if !entry.is_expired(now, self.ttl) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "Cache hit");
                return Ok((Arc::new(entry.into_media()), true));
            }
            Ok(Some(entry)) => {
                debug!(key = %key, stored_at = %entry.stored_at, "Cache entry expired");
                if let Err(e) = store.delete(key).await {
                    warn!(key = %key, error = %e, "Failed to delete expired entry");
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read cache entry, treating as miss");
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let media = self.fetch_and_store(store, key, context).await?;
        Ok((media, false))
    }

    async fn fetch_and_store(
        &self,
        store: &Arc<dyn MediaStore>,
        key: &str,
        context: Option<&str>,
    ) -> Result<Arc<FetchedMedia>> {
        let started = AtomicBool::new(false);
        let init = {
            let store = store.clone();
            let fetcher = self.fetcher.clone();
            let clock = self.clock.clone();
            let removal_epoch = self.removal_epoch.clone();
            let write_gate = self.write_gate.clone();
            let started = &started;
            let key = key.to_string();
            let context = context.map(str::to_string);
            async move {
                started.store(true, Ordering::Relaxed);
                let epoch = removal_epoch.load(Ordering::SeqCst);
                let media = fetcher.fetch(&key).await?;

                let _gate = write_gate.read().await;
                if removal_epoch.load(Ordering::SeqCst) != epoch {
                    debug!(key = %key, "Entry removed during fetch, not storing");
                    return Ok::<_, FetchError>(Arc::new(media));
                }
                let entry = CacheEntry::new(&key, &media, clock.now(), context.as_deref());
                // The content is still served for this call when persisting fails
                if let Err(e) = store.put(&entry).await {
                    warn!(key = %key, error = %e, "Failed to persist fetched media");
                }
                Ok::<_, FetchError>(Arc::new(media))
            }
        };

        let result = self.in_flight.try_get_with(key.to_string(), init).await;
        self.in_flight.invalidate(key).await;

        if context.is_some() && !started.load(Ordering::Relaxed) {
            debug!(key = %key, "Joined an in-flight fetch, context not recorded");
        }

        result.map_err(|e| {
            self.fetch_failures.fetch_add(1, Ordering::Relaxed);
            CacheError::Fetch((*e).clone())
        })
    }

    async fn fetch_uncached(&self, key: &str) -> Result<FetchedMedia> {
        self.fetcher.fetch(key).await.map_err(|e| {
            self.fetch_failures.fetch_add(1, Ordering::Relaxed);
            CacheError::Fetch(e)
        })
    }
}

fn ttl_from_duration(ttl: Duration) -> TimeDelta {
    TimeDelta::from_std(ttl.min(Duration::from_secs(MAX_TTL_SECS)))
        .unwrap_or(TimeDelta::seconds(MAX_TTL_SECS as i64))
}
