//! Error types for the media cache

use std::fmt;

/// Failure of the fetch collaborator
///
/// `Clone` so every caller waiting on a coalesced fetch receives the same error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    InvalidUrl(String),
    Status { url: String, status: u16 },
    Transport { url: String, message: String },
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl(msg) => write!(f, "Invalid URL: {msg}"),
            Self::Status { url, status } => write!(f, "{url} returned status {status}"),
            Self::Transport { url, message } => write!(f, "Request to {url} failed: {message}"),
        }
    }
}

impl std::error::Error for FetchError {}

#[derive(Debug)]
pub enum CacheError {
    /// The persistence backend is disabled or could not be opened
    StoreUnavailable(String),
    Fetch(FetchError),
    /// A store read failed; callers treat this as a miss
    Read(String),
    /// A store upsert or delete failed (e.g. quota exceeded)
    Write(String),
    ConversionFailure(String),
    InvalidLocator(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StoreUnavailable(msg) => write!(f, "Store unavailable: {msg}"),
            Self::Fetch(err) => write!(f, "Fetch error: {err}"),
            Self::Read(msg) => write!(f, "Store read error: {msg}"),
            Self::Write(msg) => write!(f, "Store write error: {msg}"),
            Self::ConversionFailure(msg) => write!(f, "Conversion failure: {msg}"),
            Self::InvalidLocator(msg) => write!(f, "Invalid locator: {msg}"),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fetch(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FetchError> for CacheError {
    fn from(err: FetchError) -> Self {
        Self::Fetch(err)
    }
}

impl From<sqlx::migrate::MigrateError> for CacheError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::StoreUnavailable(format!("schema migration failed: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
