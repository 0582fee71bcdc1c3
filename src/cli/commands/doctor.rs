//! Doctor command - verify configuration and inputs.

use crate::audio::format_size;
use crate::audio_source::AudioLocator;
use crate::cli::Output;
use crate::config::{Settings, TitleBackend};
use crate::manifest::RunManifest;
use crate::openai::API_KEY_VAR;
use console::style;
use std::path::Path;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

fn print_section(title: &str, checks: &[CheckResult]) {
    println!("{}", style(title).bold());
    for check in checks {
        check.print();
    }
    println!();
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, config_path: Option<&str>) -> anyhow::Result<()> {
    Output::header("clipscribe doctor");
    println!();

    let mut checks = Vec::new();

    let api = vec![check_openai_api_key(std::env::var(API_KEY_VAR).ok())];
    print_section("API Configuration", &api);
    checks.extend(api);

    let providers = check_providers(settings);
    print_section("Title Providers", &providers);
    checks.extend(providers);

    let documents = check_documents(settings);
    print_section("Documents", &documents);
    checks.extend(documents);

    let dirs = check_directories(settings);
    print_section("Directories", &dirs);
    checks.extend(dirs);

    let config = vec![
        check_config_file(config_path),
        CheckResult::ok(
            "Transcript cache",
            &format!("keyed by {}", settings.transcription.cache_key),
        ),
    ];
    print_section("Configuration", &config);
    checks.extend(config);

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before running clipscribe.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! clipscribe is ready to use.");
    }

    Ok(())
}

fn check_openai_api_key(value: Option<String>) -> CheckResult {
    let hint = format!("Set with: export {}='sk-...'", API_KEY_VAR);
    match value {
        Some(key) if key.starts_with("sk-") && key.len() > 20 => {
            let masked = format!("{}...{}", &key[..7], &key[key.len() - 4..]);
            CheckResult::ok(API_KEY_VAR, &format!("configured ({})", masked))
        }
        Some(key) if key.is_empty() => CheckResult::error(API_KEY_VAR, "empty", &hint),
        Some(_) => CheckResult::warning(
            API_KEY_VAR,
            "set but format looks unusual",
            "Expected format: sk-... (OpenAI API key)",
        ),
        None => CheckResult::error(API_KEY_VAR, "not set", &hint),
    }
}

fn check_providers(settings: &Settings) -> Vec<CheckResult> {
    if settings.titles.providers.is_empty() {
        return vec![CheckResult::warning(
            "Providers",
            "none configured",
            "Titles will fall back to the first sentence of each transcript",
        )];
    }

    settings
        .titles
        .providers
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let target = match p.backend {
                TitleBackend::OpenAI => "OpenAI".to_string(),
                TitleBackend::Ollama => settings.titles.ollama_url.clone(),
            };
            CheckResult::ok(
                &format!("#{}", i + 1),
                &format!("{} ({}, {})", p.model, p.backend, target),
            )
        })
        .collect()
}

fn check_documents(settings: &Settings) -> Vec<CheckResult> {
    let locator = AudioLocator::from_settings(&settings.source).ok();

    settings
        .document_paths()
        .iter()
        .map(|path| {
            let name = path.display().to_string();
            match std::fs::read_to_string(path) {
                Ok(html) => {
                    let count = locator.as_ref().map(|l| l.extract(&html).len()).unwrap_or(0);
                    CheckResult::ok(&name, &format!("{} audio URLs", count))
                }
                Err(_) => CheckResult::warning(&name, "not found", "It will be skipped during runs"),
            }
        })
        .collect()
}

fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    let mut results = vec![
        check_dir("Output directory", &settings.output_dir()),
        check_dir("Backup directory", &settings.backup_dir()),
    ];

    let manifest_path = settings.manifest_path();
    if manifest_path.exists() {
        match RunManifest::load(&manifest_path) {
            Ok(manifest) => {
                let size = std::fs::metadata(&manifest_path)
                    .map(|m| format_size(m.len()))
                    .unwrap_or_else(|_| "unknown size".to_string());
                results.push(CheckResult::ok(
                    "Manifest",
                    &format!("{} ({} entries, {})", manifest_path.display(), manifest.len(), size),
                ));
            }
            Err(e) => results.push(CheckResult::error(
                "Manifest",
                &format!("{} is unreadable: {}", manifest_path.display(), e),
                "Fix or delete the file; transcripts on disk are reused either way",
            )),
        }
    } else {
        results.push(CheckResult::warning(
            "Manifest",
            &format!("{} (not created yet)", manifest_path.display()),
            "It is written during the first run",
        ));
    }

    results
}

fn check_dir(name: &str, path: &Path) -> CheckResult {
    if path.exists() {
        CheckResult::ok(name, &path.display().to_string())
    } else {
        CheckResult::warning(
            name,
            &format!("{} (will be created)", path.display()),
            "Directory will be created on first use",
        )
    }
}

fn check_config_file(explicit: Option<&str>) -> CheckResult {
    let explicit = explicit.map(Settings::expand_path);
    let config_path = Settings::resolve_config_path(explicit.as_ref());
    if config_path.exists() {
        CheckResult::ok("Config file", &config_path.display().to_string())
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: clipscribe config init",
        )
    }
}
