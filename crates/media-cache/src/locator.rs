//! Locator classification

use crate::error::{CacheError, Result};

const LOCAL_REFERENCE_SCHEME: &str = "blob:";
const EMBEDDED_SCHEME: &str = "data:";

/// What a locator points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorKind {
    /// A network resource that has to be fetched
    Remote,
    /// A transient in-process reference previously minted by the cache
    LocalReference,
    /// Content already embedded in the locator itself
    Embedded,
}

/// A validated, classified locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator<'a> {
    raw: &'a str,
    kind: LocatorKind,
}

impl<'a> Locator<'a> {
    /// Classify a locator string. Empty input is rejected.
    pub fn parse(raw: &'a str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Err(CacheError::InvalidLocator("locator is empty".to_string()));
        }

        let kind = if has_scheme(raw, LOCAL_REFERENCE_SCHEME) {
            LocatorKind::LocalReference
        } else if has_scheme(raw, EMBEDDED_SCHEME) {
            LocatorKind::Embedded
        } else {
            LocatorKind::Remote
        };

        Ok(Self { raw, kind })
    }

    pub fn kind(&self) -> LocatorKind {
        self.kind
    }

    pub fn as_str(&self) -> &'a str {
        self.raw
    }

    pub fn is_remote(&self) -> bool {
        self.kind == LocatorKind::Remote
    }
}

fn has_scheme(raw: &str, scheme: &str) -> bool {
    raw.len() >= scheme.len()
        && raw.is_char_boundary(scheme.len())
        && raw[..scheme.len()].eq_ignore_ascii_case(scheme)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_locator() {
        let locator = Locator::parse("https://example.com/a.jpg").unwrap();
        assert_eq!(locator.kind(), LocatorKind::Remote);
        assert!(locator.is_remote());
        assert_eq!(locator.as_str(), "https://example.com/a.jpg");
    }

    #[test]
    fn test_local_reference_locator() {
        let locator = Locator::parse("blob:media-cache/1234").unwrap();
        assert_eq!(locator.kind(), LocatorKind::LocalReference);

        // Scheme matching ignores case
        let locator = Locator::parse("BLOB:media-cache/1234").unwrap();
        assert_eq!(locator.kind(), LocatorKind::LocalReference);
    }

    #[test]
    fn test_embedded_locator() {
        let locator = Locator::parse("data:image/png;base64,AAAA").unwrap();
        assert_eq!(locator.kind(), LocatorKind::Embedded);
        assert!(!locator.is_remote());
    }

    #[test]
    fn test_relative_path_is_remote() {
        let locator = Locator::parse("/images/a.png").unwrap();
        assert_eq!(locator.kind(), LocatorKind::Remote);
    }

    #[test]
    fn test_empty_locator_rejected() {
        assert!(matches!(
            Locator::parse(""),
            Err(CacheError::InvalidLocator(_))
        ));
        assert!(matches!(
            Locator::parse("   "),
            Err(CacheError::InvalidLocator(_))
        ));
    }

    #[test]
    fn test_short_and_multibyte_input() {
        assert_eq!(Locator::parse("da").unwrap().kind(), LocatorKind::Remote);
        assert_eq!(
            Locator::parse("dé:foo").unwrap().kind(),
            LocatorKind::Remote
        );
    }
}
