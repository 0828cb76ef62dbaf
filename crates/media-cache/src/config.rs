use std::env;
use std::path::PathBuf;

use crate::store::StoreBackend;

pub(crate) const DEFAULT_TTL_SECS: u64 = 7 * 24 * 60 * 60; // 7 days
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_CONNECTIONS: u32 = 4;

/// Which persistence backend to open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Sqlite,
    Memory,
    Disabled,
}

impl BackendKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Some(Self::Sqlite),
            "memory" => Some(Self::Memory),
            "disabled" | "none" | "off" => Some(Self::Disabled),
            _ => None,
        }
    }
}

/// Media cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub backend: BackendKind,
    pub db_path: PathBuf,
    pub ttl_secs: u64,
    pub fetch_timeout_secs: u64,
    pub max_connections: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Sqlite,
            db_path: PathBuf::from("./cache/media.db"),
            ttl_secs: DEFAULT_TTL_SECS,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl CacheConfig {
    /// Parse configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Parse configuration from an arbitrary variable source.
    /// Missing or unparseable values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let backend = lookup("MEDIA_CACHE_BACKEND")
            .and_then(|s| BackendKind::parse(&s))
            .unwrap_or(defaults.backend);

        let db_path = lookup("MEDIA_CACHE_PATH")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let ttl_secs = lookup("MEDIA_CACHE_TTL_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|&secs| secs > 0)
            .unwrap_or(defaults.ttl_secs);

        let fetch_timeout_secs = lookup("FETCH_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|&secs| secs > 0)
            .unwrap_or(defaults.fetch_timeout_secs);

        let max_connections = lookup("MEDIA_CACHE_MAX_CONNECTIONS")
            .and_then(|s| s.parse::<u32>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(defaults.max_connections);

        Self {
            backend,
            db_path,
            ttl_secs,
            fetch_timeout_secs,
            max_connections,
        }
    }

    /// The store backend this configuration selects
    pub fn store_backend(&self) -> StoreBackend {
        match self.backend {
            BackendKind::Sqlite => StoreBackend::Sqlite {
                path: self.db_path.clone(),
                max_connections: self.max_connections,
            },
            BackendKind::Memory => StoreBackend::Memory,
            BackendKind::Disabled => StoreBackend::Disabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.backend, BackendKind::Sqlite);
        assert_eq!(config.db_path, PathBuf::from("./cache/media.db"));
        assert_eq!(config.ttl_secs, 7 * 24 * 60 * 60);
        assert_eq!(config.fetch_timeout_secs, 30);
        assert_eq!(config.max_connections, 4);
    }

    #[test]
    fn test_config_from_lookup() {
        let config = CacheConfig::from_lookup(lookup_from(&[
            ("MEDIA_CACHE_BACKEND", "Memory"),
            ("MEDIA_CACHE_PATH", "/tmp/media.db"),
            ("MEDIA_CACHE_TTL_SECS", "3600"),
            ("FETCH_TIMEOUT_SECS", "5"),
            ("MEDIA_CACHE_MAX_CONNECTIONS", "2"),
        ]));

        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.db_path, PathBuf::from("/tmp/media.db"));
        assert_eq!(config.ttl_secs, 3600);
        assert_eq!(config.fetch_timeout_secs, 5);
        assert_eq!(config.max_connections, 2);
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        let config = CacheConfig::from_lookup(lookup_from(&[
            ("MEDIA_CACHE_BACKEND", "indexeddb"),
            ("MEDIA_CACHE_TTL_SECS", "0"),
            ("FETCH_TIMEOUT_SECS", "soon"),
            ("MEDIA_CACHE_MAX_CONNECTIONS", "-1"),
        ]));

        assert_eq!(config.backend, BackendKind::Sqlite);
        assert_eq!(config.ttl_secs, 7 * 24 * 60 * 60);
        assert_eq!(config.fetch_timeout_secs, 30);
        assert_eq!(config.max_connections, 4);
    }

    #[test]
    fn test_disabled_backend() {
        let config = CacheConfig::from_lookup(lookup_from(&[("MEDIA_CACHE_BACKEND", "off")]));
        assert!(matches!(config.store_backend(), StoreBackend::Disabled));
    }
}
