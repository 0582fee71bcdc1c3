//! Audio references discovered in HTML documents.
//!
//! An [`AudioReference`] is the resolved identity of one clip: its URL, the
//! storage category (the path segment before the file name) and the decoded
//! file name that keys every on-disk artifact.

mod html;

pub use html::AudioLocator;

use crate::error::{ClipscribeError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Category used when a URL has no segment before the file name.
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// Resolved identity of one audio clip.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AudioReference {
    /// Canonical URL as found in the document.
    pub url: String,
    /// Raw path segment preceding the file name (e.g. `long+talks`).
    pub category: String,
    /// Percent-decoded final path segment (e.g. `01+secret.mp3`).
    pub filename: String,
}

impl AudioReference {
    /// Derive a reference from a URL.
    pub fn from_url(url: &str) -> Result<Self> {
        let parsed = Url::parse(url)
            .map_err(|e| ClipscribeError::InvalidInput(format!("Invalid audio URL {}: {}", url, e)))?;

        let segments: Vec<&str> = parsed
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        let raw_name = segments.last().ok_or_else(|| {
            ClipscribeError::InvalidInput(format!("Audio URL has no file name: {}", url))
        })?;

        let filename = urlencoding::decode(raw_name)
            .map(|c| c.into_owned())
            .unwrap_or_else(|_| raw_name.to_string());

        let category = if segments.len() > 1 {
            segments[segments.len() - 2].to_string()
        } else {
            UNKNOWN_CATEGORY.to_string()
        };

        Ok(Self {
            url: url.to_string(),
            category,
            filename,
        })
    }
}

/// Stem of an audio file name (`01+secret.mp3` -> `01+secret`).
pub fn file_stem(filename: &str) -> &str {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
}

/// File name of the last URL segment, decoded; `None` for unparseable URLs.
pub fn filename_for_url(url: &str) -> Option<String> {
    AudioReference::from_url(url).ok().map(|r| r.filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_from_url() {
        let r = AudioReference::from_url(
            "https://s3-us-west-1.amazonaws.com/randombmir/long+talks/02+the%20burn.mp3",
        )
        .unwrap();

        assert_eq!(r.category, "long+talks");
        assert_eq!(r.filename, "02+the burn.mp3");
        assert_eq!(file_stem(&r.filename), "02+the burn");
    }

    #[test]
    fn test_reference_keeps_plus_signs() {
        let r = AudioReference::from_url("https://host/randombmir/random/01+secret.mp3").unwrap();
        assert_eq!(r.filename, "01+secret.mp3");
        assert_eq!(r.category, "random");
    }

    #[test]
    fn test_reference_without_category() {
        let r = AudioReference::from_url("https://host/clip.mp3").unwrap();
        assert_eq!(r.category, UNKNOWN_CATEGORY);
        assert_eq!(r.filename, "clip.mp3");
    }

    #[test]
    fn test_reference_rejects_bad_urls() {
        assert!(AudioReference::from_url("not a url").is_err());
        assert!(AudioReference::from_url("https://host/").is_err());
    }
}
