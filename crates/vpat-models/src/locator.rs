//! Source video locators.

use std::path::PathBuf;

use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocatorError {
    #[error("Empty source locator")]
    Empty,

    #[error("Unsupported locator scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Invalid file URL: {0}")]
    InvalidFileUrl(String),
}

/// Where the source video lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocator {
    /// Fetched over HTTP(S) into local storage before sampling
    Remote(Url),
    /// Already a local, seekable file
    Local(PathBuf),
}

impl SourceLocator {
    /// Parse an `http(s)://` URL, a `file://` URL or a plain path.
    pub fn parse(raw: &str) -> Result<Self, LocatorError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(LocatorError::Empty);
        }

        match Url::parse(raw) {
            Ok(url) => match url.scheme() {
                "http" | "https" => Ok(Self::Remote(url)),
                "file" => url
                    .to_file_path()
                    .map(Self::Local)
                    .map_err(|_| LocatorError::InvalidFileUrl(raw.to_string())),
                // Windows drive letters parse as a one-letter scheme
                scheme if scheme.len() == 1 => Ok(Self::Local(PathBuf::from(raw))),
                scheme => Err(LocatorError::UnsupportedScheme(scheme.to_string())),
            },
            Err(_) => Ok(Self::Local(PathBuf::from(raw))),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, SourceLocator::Remote(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_remote() {
        let loc = SourceLocator::parse("https://cdn.example.com/match.mp4").unwrap();
        assert!(loc.is_remote());
    }

    #[test]
    fn test_parse_plain_path() {
        let loc = SourceLocator::parse("/data/videos/match.mp4").unwrap();
        assert_eq!(loc, SourceLocator::Local(PathBuf::from("/data/videos/match.mp4")));
    }

    #[test]
    fn test_parse_file_url() {
        let loc = SourceLocator::parse("file:///data/videos/match.mp4").unwrap();
        assert_eq!(loc, SourceLocator::Local(PathBuf::from("/data/videos/match.mp4")));
    }

    #[test]
    fn test_parse_rejects_unknown_scheme() {
        assert_eq!(
            SourceLocator::parse("s3://bucket/key.mp4"),
            Err(LocatorError::UnsupportedScheme("s3".to_string()))
        );
        assert_eq!(SourceLocator::parse("  "), Err(LocatorError::Empty));
    }
}
