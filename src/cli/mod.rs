//! CLI module for clipscribe.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// clipscribe - titles for audio pages
///
/// Downloads the audio clips linked from static HTML pages, transcribes them,
/// chooses a short title for each and writes the titles back into the pages.
#[derive(Parser, Debug)]
#[command(name = "clipscribe")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "CLIPSCRIBE_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download, transcribe, title and patch audio pages
    Run {
        /// Pages to process (defaults to the configured documents)
        documents: Vec<String>,

        /// Only regenerate titles from existing transcripts, for the primary page
        #[arg(long)]
        titles_only: bool,

        /// Skip the API key validation call
        #[arg(long)]
        skip_validation: bool,
    },

    /// Download every referenced audio file into a per-category backup
    Backup {
        /// Pages to scan (defaults to the configured documents)
        documents: Vec<String>,

        /// Backup directory (defaults to download.backup_dir)
        #[arg(short, long)]
        dir: Option<String>,
    },

    /// Apply titles recorded in the manifest without generating new ones
    Apply {
        /// Page to patch (defaults to the primary document)
        document: Option<String>,
    },

    /// List title files and their effective titles
    Review,

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration to the config file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
