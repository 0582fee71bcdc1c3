//! Apply command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Patch a page with the titles recorded in the manifest.
pub fn run_apply(document: Option<&str>, settings: Settings) -> Result<()> {
    let document = document
        .map(Settings::expand_path)
        .or_else(|| settings.primary_document())
        .ok_or_else(|| anyhow::anyhow!("No document configured"))?;

    Output::info(&format!("Applying recorded titles to {}", document.display()));

    let orchestrator = Orchestrator::new(settings)?;
    let outcome = orchestrator.apply_from_manifest(&document)?;

    if outcome.changed {
        Output::success(&format!("Applied {} titles", outcome.applied));
        if outcome.backup_created {
            Output::info("Original saved next to the page with a .backup suffix");
        }
    } else if outcome.applied > 0 {
        Output::info("Page already has the recorded titles");
    } else {
        Output::warning("No recorded titles matched this page");
    }

    Ok(())
}
