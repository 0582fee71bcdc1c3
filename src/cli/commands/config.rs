//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;

/// Run the config command.
pub fn run_config(action: &ConfigAction, settings: Settings, config_path: Option<&str>) -> Result<()> {
    let explicit = config_path.map(Settings::expand_path);
    let path = Settings::resolve_config_path(explicit.as_ref());

    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&settings)
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Path => {
            println!("{}", path.display());
        }

        ConfigAction::Init { force } => {
            if path.exists() && !force {
                Output::warning(&format!("{} already exists", path.display()));
                Output::info("Use --force to overwrite it with the defaults.");
                return Ok(());
            }
            Settings::default().save_to(&path)?;
            Output::success(&format!("Wrote default config to {}", path.display()));
        }
    }

    Ok(())
}
