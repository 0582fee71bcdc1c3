//! Pre-flight checks before network-heavy operations.
//!
//! Validates configuration up front so that a run fails before the first
//! download instead of midway.

use crate::config::Settings;
use crate::error::{ClipscribeError, Result};
use crate::openai::API_KEY_VAR;
use std::path::PathBuf;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Full pipeline: Whisper plus the title providers.
    Run,
    /// Titles from cached transcripts.
    TitlesOnly,
    /// Download-only backup.
    Backup,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Run => check_api_key(std::env::var(API_KEY_VAR).ok())?,
        Operation::TitlesOnly => {
            if settings.requires_openai(true) {
                check_api_key(std::env::var(API_KEY_VAR).ok())?;
            }
        }
        Operation::Backup => {
            // Public downloads need no credentials
        }
    }
    Ok(())
}

/// Pages that do not exist on disk.
pub fn missing_documents(documents: &[PathBuf]) -> Vec<PathBuf> {
    documents.iter().filter(|d| !d.exists()).cloned().collect()
}

fn check_api_key(value: Option<String>) -> Result<()> {
    match value {
        Some(key) if !key.is_empty() => Ok(()),
        Some(_) => Err(ClipscribeError::Authentication(format!(
            "{} is empty. Set it with: export {}='sk-...'",
            API_KEY_VAR, API_KEY_VAR
        ))),
        None => Err(ClipscribeError::Authentication(format!(
            "{} not set. Set it with: export {}='sk-...'",
            API_KEY_VAR, API_KEY_VAR
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProviderSettings, TitleBackend};

    #[test]
    fn test_backup_has_no_requirements() {
        assert!(check(Operation::Backup, &Settings::default()).is_ok());
    }

    #[test]
    fn test_titles_only_with_local_providers() {
        let mut settings = Settings::default();
        settings.titles.providers = vec![ProviderSettings {
            backend: TitleBackend::Ollama,
            model: "llama3.2".to_string(),
        }];
        assert!(check(Operation::TitlesOnly, &settings).is_ok());
    }

    #[test]
    fn test_api_key_values() {
        assert!(check_api_key(Some("sk-test".to_string())).is_ok());
        assert!(matches!(
            check_api_key(Some(String::new())),
            Err(ClipscribeError::Authentication(_))
        ));
        assert!(matches!(check_api_key(None), Err(ClipscribeError::Authentication(_))));
    }

    #[test]
    fn test_missing_documents() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("index.html");
        std::fs::write(&present, "<html></html>").unwrap();
        let absent = dir.path().join("inc.html");

        assert_eq!(missing_documents(&[present, absent.clone()]), vec![absent]);
    }
}
