//! Core types for the media cache server

use media_cache::{CacheConfig, CacheStats};
use serde::{Deserialize, Serialize};
use std::env;

/// Configuration for the server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Seconds between periodic expiry sweeps; 0 disables them
    pub sweep_interval_secs: u64,
    pub cache: CacheConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            sweep_interval_secs: 60 * 60, // hourly
            cache: CacheConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parse configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(defaults.port);

        let sweep_interval_secs = env::var("SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(defaults.sweep_interval_secs);

        Self {
            port,
            sweep_interval_secs,
            cache: CacheConfig::from_env(),
        }
    }
}

/// Query string carrying the media locator
#[derive(Debug, Deserialize)]
pub struct MediaQuery {
    pub url: String,
}

/// Response body for /embed
#[derive(Debug, Serialize, Deserialize)]
pub struct EmbedResponse {
    pub data_uri: String,
    pub mime_type: String,
}

/// Response body for /sweep
#[derive(Debug, Serialize, Deserialize)]
pub struct SweepResponse {
    pub removed: u64,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub cache: CacheStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3001);
        assert_eq!(config.sweep_interval_secs, 3600);
        assert_eq!(config.cache.ttl_secs, 7 * 24 * 60 * 60);
    }

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "ok".to_string(),
            uptime_secs: 3600,
            cache: CacheStats {
                entries: 100,
                hits: 500,
                misses: 50,
                fetch_failures: 2,
                store_available: true,
            },
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("3600"));
        assert!(json.contains("\"store_available\":true"));
    }

    #[test]
    fn test_media_query_deserialization() {
        let query: MediaQuery =
            serde_json::from_str(r#"{"url": "https://example.com/a.jpg"}"#).unwrap();
        assert_eq!(query.url, "https://example.com/a.jpg");
    }
}
