//! Error types for the media cache server

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use media_cache::CacheError;
use serde_json::json;
use std::fmt;

/// Startup and configuration failures
#[derive(Debug)]
pub enum ServerError {
    Io(Box<std::io::Error>),
    Config(String),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Io(err) => write!(f, "IO error: {}", err),
            ServerError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerError::Io(err) => Some(err.as_ref()),
            ServerError::Config(_) => None,
        }
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Io(Box::new(err))
    }
}

impl From<tracing_subscriber::filter::ParseError> for ServerError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        ServerError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;

/// Request error that converts to an HTTP response
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Cache(CacheError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Cache(err) => {
                let status = match &err {
                    CacheError::InvalidLocator(_) => StatusCode::BAD_REQUEST,
                    CacheError::Fetch(_) => StatusCode::BAD_GATEWAY,
                    CacheError::ConversionFailure(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    CacheError::StoreUnavailable(_)
                    | CacheError::Read(_)
                    | CacheError::Write(_) => {
                        tracing::error!(error = %err, "Media cache error");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, err.to_string())
            }
        };

        (status, axum::Json(json!({ "error": message }))).into_response()
    }
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        ApiError::Cache(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_cache::FetchError;

    #[test]
    fn test_config_error_display() {
        let err = ServerError::Config("invalid PORT".to_string());
        assert_eq!(format!("{}", err), "Configuration error: invalid PORT");
    }

    #[test]
    fn test_io_error_has_source() {
        let err: ServerError = std::io::Error::other("address in use").into();
        assert!(format!("{}", err).contains("address in use"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_cache_error_status_codes() {
        let cases = [
            (
                CacheError::InvalidLocator("empty".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                CacheError::Fetch(FetchError::Status {
                    url: "https://example.com/a.jpg".to_string(),
                    status: 500,
                }),
                StatusCode::BAD_GATEWAY,
            ),
            (
                CacheError::ConversionFailure("bad mime".to_string()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                CacheError::Write("quota".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_bad_request_status() {
        let response = ApiError::BadRequest("missing url".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
