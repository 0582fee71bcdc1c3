//! Run command implementation.

use crate::audio::format_size;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::openai;
use crate::orchestrator::{Orchestrator, RunReport};
use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

/// Timeout for the credential validation call.
const VALIDATION_TIMEOUT_SECS: u64 = 30;

/// Run the full pipeline, or the titles-only pass.
pub async fn run_pipeline(
    documents: &[String],
    titles_only: bool,
    skip_validation: bool,
    settings: Settings,
) -> Result<()> {
    let operation = if titles_only {
        Operation::TitlesOnly
    } else {
        Operation::Run
    };

    // Pre-flight checks
    if let Err(e) = preflight::check(operation, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'clipscribe doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    if settings.requires_openai(titles_only) && !skip_validation {
        validate_api_key().await?;
    }

    let orchestrator = Orchestrator::new(settings)?.with_progress(true);

    if titles_only {
        let document = documents
            .first()
            .map(|d| Settings::expand_path(d))
            .or_else(|| orchestrator.settings().primary_document())
            .ok_or_else(|| anyhow::anyhow!("No document configured"))?;

        Output::header("Regenerating titles");
        Output::info(&format!("Using existing transcripts for {}", document.display()));

        let report = orchestrator.run_titles_only(&document).await?;
        print_report(&report, true);
    } else {
        let documents = resolve_documents(documents, orchestrator.settings());
        for missing in preflight::missing_documents(&documents) {
            Output::warning(&format!("{} not found, skipping", missing.display()));
        }

        Output::header("Processing audio pages");
        let report = orchestrator.run_full(&documents).await?;
        print_report(&report, false);
    }

    Ok(())
}

/// Pages named on the command line, or the configured ones.
pub(super) fn resolve_documents(documents: &[String], settings: &Settings) -> Vec<PathBuf> {
    if documents.is_empty() {
        settings.document_paths()
    } else {
        documents.iter().map(|d| Settings::expand_path(d)).collect()
    }
}

async fn validate_api_key() -> Result<()> {
    let spinner = Output::spinner("Validating API key...");
    let client = openai::create_client_with_timeout(Duration::from_secs(VALIDATION_TIMEOUT_SECS))?;
    let result = openai::validate_credentials(&client).await;
    spinner.finish_and_clear();

    match result {
        Ok(()) => {
            Output::success("API key is valid");
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("{}", e));
            Output::info("Use --skip-validation to bypass this check.");
            Err(e.into())
        }
    }
}

fn print_report(report: &RunReport, titles_only: bool) {
    Output::header("Summary");

    if !titles_only {
        Output::kv("Downloaded", &report.downloaded.to_string());
        Output::kv("Already on disk", &report.cached.to_string());
        Output::kv("Failed downloads", &report.failed.to_string());
        Output::kv("Total size", &format_size(report.total_bytes));
        Output::kv("Transcribed", &report.transcribed.to_string());
        Output::kv("Transcripts reused", &report.transcripts_cached.to_string());
        Output::kv("Failed transcriptions", &report.transcribe_failed.to_string());
    } else {
        Output::kv("Transcripts used", &report.transcripts_cached.to_string());
        Output::kv("Without transcript", &report.untranscribed.to_string());
    }

    Output::kv("Human titles", &report.human.to_string());
    Output::kv("Generated titles", &report.generated.to_string());
    Output::kv("First-sentence titles", &report.heuristic.to_string());
    Output::kv("Untitled", &report.title_failed.to_string());
    Output::kv("Pages patched", &report.documents_patched.to_string());
    Output::kv("Titles applied", &report.titles_applied.to_string());

    println!();
    let problems = report.failed + report.transcribe_failed + report.title_failed;
    if problems > 0 {
        Output::warning(&format!(
            "{} file(s) could not be processed. Re-run to retry them.",
            problems
        ));
    } else {
        Output::success("Done. Edit the .title files to adjust titles, then re-run.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_documents_defaults_to_config() {
        let settings = Settings::default();
        let docs = resolve_documents(&[], &settings);
        assert_eq!(docs.len(), 4);
        assert_eq!(docs[0], PathBuf::from("index.html"));

        let docs = resolve_documents(&["other.html".to_string()], &settings);
        assert_eq!(docs, vec![PathBuf::from("other.html")]);
    }
}
