//! Cache types

use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data_uri::EmbeddedDataUri;
use crate::error::Result;

const LOCAL_REFERENCE_PREFIX: &str = "blob:media-cache/";

/// Binary content returned by the fetch collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMedia {
    pub content: Bytes,
    /// Normalized MIME type
    pub content_type: String,
}

/// A stored blob, keyed by its locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub content: Bytes,
    pub content_type: String,
    pub stored_at: DateTime<Utc>,
    /// Opaque tag such as the originating message id. Never used for lookup.
    pub context: Option<String>,
}

impl CacheEntry {
    pub fn new(
        key: &str,
        media: &FetchedMedia,
        stored_at: DateTime<Utc>,
        context: Option<&str>,
    ) -> Self {
        Self {
            key: key.to_string(),
            content: media.content.clone(),
            content_type: media.content_type.clone(),
            stored_at,
            context: context.map(str::to_string),
        }
    }

    /// An entry is stale once its age reaches the TTL
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
        now - self.stored_at >= ttl
    }

    pub fn into_media(self) -> FetchedMedia {
        FetchedMedia {
            content: self.content,
            content_type: self.content_type,
        }
    }
}

/// A transient handle for rendering cached content locally.
///
/// A new handle is minted on every call; the holder owns it and releases it
/// by dropping it.
#[derive(Debug)]
pub struct LocalReference {
    url: String,
    content_type: String,
    content: Bytes,
    from_cache: bool,
}

impl LocalReference {
    pub(crate) fn mint(media: &FetchedMedia, from_cache: bool) -> Self {
        Self {
            url: format!("{LOCAL_REFERENCE_PREFIX}{}", Uuid::new_v4()),
            content_type: media.content_type.clone(),
            content: media.content.clone(),
            from_cache,
        }
    }

    /// The `blob:` URL identifying this handle
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// Whether the content came from the store rather than the network
    pub fn from_cache(&self) -> bool {
        self.from_cache
    }

    /// Embed the referenced content without touching the network
    pub fn to_data_uri(&self) -> Result<EmbeddedDataUri> {
        EmbeddedDataUri::encode(&self.content_type, &self.content)
    }
}

/// Result of `MediaCache::fetch_or_serve`
#[derive(Debug)]
pub enum MediaRef {
    /// Freshly minted handle over cached or just-fetched content
    Local(LocalReference),
    /// The input locator, returned unchanged
    Passthrough(String),
}

impl MediaRef {
    pub fn as_str(&self) -> &str {
        match self {
            MediaRef::Local(reference) => reference.url(),
            MediaRef::Passthrough(locator) => locator,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, MediaRef::Local(_))
    }

    pub fn into_local(self) -> Option<LocalReference> {
        match self {
            MediaRef::Local(reference) => Some(reference),
            MediaRef::Passthrough(_) => None,
        }
    }
}

/// Statistics about the cache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: u64,
    pub hits: u64,
    pub misses: u64,
    pub fetch_failures: u64,
    pub store_available: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg() -> FetchedMedia {
        FetchedMedia {
            content: Bytes::from_static(&[0xff, 0xd8, 0xff, 0xe0]),
            content_type: "image/jpeg".to_string(),
        }
    }

    #[test]
    fn test_cache_stats_default() {
        let stats = CacheStats::default();
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.fetch_failures, 0);
        assert!(!stats.store_available);
    }

    #[test]
    fn test_cache_stats_serialization() {
        let stats = CacheStats {
            entries: 3,
            hits: 500,
            misses: 50,
            fetch_failures: 1,
            store_available: true,
        };

        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"hits\":500"));

        let deserialized: CacheStats = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.misses, 50);
        assert!(deserialized.store_available);
    }

    #[test]
    fn test_entry_expiry_boundary() {
        let stored_at = Utc::now();
        let entry = CacheEntry::new("https://example.com/a.jpg", &jpeg(), stored_at, None);
        let ttl = TimeDelta::days(7);

        assert!(!entry.is_expired(stored_at, ttl));
        assert!(!entry.is_expired(stored_at + TimeDelta::days(7) - TimeDelta::seconds(1), ttl));
        assert!(entry.is_expired(stored_at + TimeDelta::days(7), ttl));
        assert!(entry.is_expired(stored_at + TimeDelta::days(8), ttl));
    }

    #[test]
    fn test_entry_keeps_context() {
        let entry = CacheEntry::new("https://example.com/a.jpg", &jpeg(), Utc::now(), Some("msg-42"));
        assert_eq!(entry.context.as_deref(), Some("msg-42"));
        assert_eq!(entry.into_media(), jpeg());
    }

    #[test]
    fn test_every_mint_is_a_new_reference() {
        let media = jpeg();
        let first = LocalReference::mint(&media, false);
        let second = LocalReference::mint(&media, true);

        assert!(first.url().starts_with("blob:media-cache/"));
        assert_ne!(first.url(), second.url());
        assert_eq!(first.content(), second.content());
        assert_eq!(first.content_type(), "image/jpeg");
        assert!(!first.from_cache());
        assert!(second.from_cache());
    }

    #[test]
    fn test_local_reference_to_data_uri() {
        let reference = LocalReference::mint(&jpeg(), false);
        let uri = reference.to_data_uri().unwrap();
        assert_eq!(uri.as_str(), "data:image/jpeg;base64,/9j/4A==");
    }

    #[test]
    fn test_media_ref_as_str() {
        let passthrough = MediaRef::Passthrough("https://example.com/a.jpg".to_string());
        assert_eq!(passthrough.as_str(), "https://example.com/a.jpg");
        assert!(!passthrough.is_local());
        assert!(passthrough.into_local().is_none());

        let local = MediaRef::Local(LocalReference::mint(&jpeg(), false));
        assert!(local.as_str().starts_with("blob:"));
        assert!(local.is_local());
    }
}
