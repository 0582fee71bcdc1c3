//! Locates audio URLs inside raw HTML text.

use super::AudioReference;
use crate::config::SourceSettings;
use crate::error::{ClipscribeError, Result};
use regex::Regex;
use std::collections::BTreeSet;
use tracing::warn;

/// Scans HTML for the two audio reference forms.
///
/// - `src="<prefix>.../<name>.<ext>"`
/// - `data-audio="<prefix>.../<name>.<ext>"`
#[derive(Debug, Clone)]
pub struct AudioLocator {
    patterns: Vec<Regex>,
}

impl AudioLocator {
    /// Build a locator for URLs under `prefix` ending in `.extension`.
    pub fn new(prefix: &str, extension: &str) -> Result<Self> {
        let url = format!(
            r#"({}[^"]+\.{})"#,
            regex::escape(prefix),
            regex::escape(extension)
        );

        let patterns = ["src", "data-audio"]
            .iter()
            .map(|attr| {
                Regex::new(&format!(r#"{}="{}""#, attr, url)).map_err(|e| {
                    ClipscribeError::Config(format!("Invalid audio URL pattern: {}", e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    /// Build a locator from source settings.
    pub fn from_settings(settings: &SourceSettings) -> Result<Self> {
        Self::new(&settings.audio_prefix, &settings.extension)
    }

    /// Extract the unique audio URLs, sorted lexicographically.
    pub fn extract(&self, html: &str) -> Vec<String> {
        let mut urls = BTreeSet::new();
        for pattern in &self.patterns {
            for caps in pattern.captures_iter(html) {
                urls.insert(caps[1].to_string());
            }
        }
        urls.into_iter().collect()
    }

    /// Extract URLs and resolve them into references.
    ///
    /// URLs that cannot be resolved are logged and dropped.
    pub fn references(&self, html: &str) -> Vec<AudioReference> {
        self.extract(html)
            .into_iter()
            .filter_map(|url| match AudioReference::from_url(&url) {
                Ok(r) => Some(r),
                Err(e) => {
                    warn!("Skipping audio reference: {}", e);
                    None
                }
            })
            .collect()
    }
}
