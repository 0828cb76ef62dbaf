//! HTTP server for media cache endpoints
//!
//! Provides /health, /media, /embed and /sweep endpoints.

use crate::error::ApiError;
use crate::types::{EmbedResponse, HealthResponse, MediaQuery, SweepResponse};
use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use media_cache::{MediaCache, MediaRef};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

/// Shared state for the HTTP server
pub struct ServerState {
    pub cache: Arc<MediaCache>,
    pub started_at: DateTime<Utc>,
}

impl ServerState {
    pub fn new(cache: Arc<MediaCache>) -> Self {
        Self {
            cache,
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<ServerState>;

/// Create the HTTP router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/media", get(get_media).delete(delete_media))
        .route("/embed", get(get_embed))
        .route("/sweep", post(sweep))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server, returning once `shutdown` resolves
pub async fn start_server(
    state: SharedState,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let router = create_router(state);
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

/// Health check endpoint
async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let cache_stats = state.cache.stats().await;
    let uptime_secs = (Utc::now() - state.started_at).num_seconds().max(0) as u64;

    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs,
        cache: cache_stats,
    })
}

/// Serve media bytes from the cache, or redirect to the original locator
/// when the cache cannot provide them
async fn get_media(
    State(state): State<SharedState>,
    Query(query): Query<MediaQuery>,
) -> Response {
    if query.url.trim().is_empty() {
        return ApiError::BadRequest("url must not be empty".to_string()).into_response();
    }

    match state.cache.fetch_or_serve(&query.url).await {
        MediaRef::Local(reference) => {
            let cache_header = if reference.from_cache() { "HIT" } else { "MISS" };

            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, reference.content_type())
                .header(header::CACHE_CONTROL, "private, max-age=86400")
                .header("X-Cache", cache_header)
                .header("X-Media-Ref", reference.url())
                .body(Body::from(reference.content().clone()))
                .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
        MediaRef::Passthrough(locator) => {
            debug!(url = %locator, "Redirecting to original locator");
            match HeaderValue::from_str(&locator) {
                Ok(location) => {
                    (StatusCode::TEMPORARY_REDIRECT, [(header::LOCATION, location)])
                        .into_response()
                }
                Err(_) => ApiError::BadRequest("url is not a valid redirect target".to_string())
                    .into_response(),
            }
        }
    }
}

/// Convert media to an embedded data URI
async fn get_embed(
    State(state): State<SharedState>,
    Query(query): Query<MediaQuery>,
) -> Result<Json<EmbedResponse>, ApiError> {
    let uri = state.cache.url_to_embedded(&query.url).await?;
    Ok(Json(EmbedResponse {
        mime_type: uri.mime_type().to_string(),
        data_uri: uri.into_string(),
    }))
}

/// Drop a cached entry
async fn delete_media(
    State(state): State<SharedState>,
    Query(query): Query<MediaQuery>,
) -> StatusCode {
    state.cache.remove_entry(&query.url).await;
    StatusCode::NO_CONTENT
}

/// Run an expiry sweep now
async fn sweep(State(state): State<SharedState>) -> Json<SweepResponse> {
    let removed = state.cache.sweep_expired().await;
    Json(SweepResponse { removed })
}
