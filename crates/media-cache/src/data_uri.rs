//! Embedded `data:` URI encoding

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt;

use crate::error::{CacheError, Result};

const DEFAULT_MIME: &str = "application/octet-stream";
const SCHEME: &str = "data:";

/// A self-contained `data:<mime>;base64,<payload>` string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedDataUri(String);

impl EmbeddedDataUri {
    /// Encode binary content under the given MIME type
    pub fn encode(mime_type: &str, content: &[u8]) -> Result<Self> {
        if !is_valid_mime(mime_type) {
            return Err(CacheError::ConversionFailure(format!(
                "invalid MIME type {mime_type:?}"
            )));
        }
        Ok(Self(format!(
            "{SCHEME}{mime_type};base64,{}",
            STANDARD.encode(content)
        )))
    }

    /// Accept a value that is already an embedded data URI
    pub fn parse(raw: &str) -> Result<Self> {
        let is_data = raw.len() >= SCHEME.len()
            && raw.is_char_boundary(SCHEME.len())
            && raw[..SCHEME.len()].eq_ignore_ascii_case(SCHEME);
        if !is_data || !raw.contains(',') {
            return Err(CacheError::ConversionFailure(
                "not an embedded data URI".to_string(),
            ));
        }
        Ok(Self(raw.to_string()))
    }

    /// MIME type declared in the header, `text/plain` when omitted (RFC 2397)
    pub fn mime_type(&self) -> &str {
        let header = self.0[SCHEME.len()..].split(',').next().unwrap_or_default();
        let mime = header.split(';').next().unwrap_or_default();
        if mime.is_empty() {
            "text/plain"
        } else {
            mime
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for EmbeddedDataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reduce a `Content-Type` header to its lowercase essence
pub fn normalize_mime(hint: Option<&str>) -> String {
    hint.and_then(|h| h.split(';').next())
        .map(|m| m.trim().to_ascii_lowercase())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| DEFAULT_MIME.to_string())
}

fn is_valid_mime(mime: &str) -> bool {
    let is_token = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "!#$&-^_.+".contains(c))
    };
    match mime.split_once('/') {
        Some((kind, subtype)) => is_token(kind) && is_token(subtype),
        None => false,
    }
}
