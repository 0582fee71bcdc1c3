//! Configuration module for clipscribe.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, TitlePrompts};
pub use settings::{
    CacheKeyMode, DocumentSettings, DownloadSettings, GeneralSettings, PromptSettings,
    ProviderSettings, Settings, SourceSettings, TitleBackend, TitleSettings,
    TranscriptionSettings, LOCAL_CONFIG_FILE,
};
