//! Prompt templates for clipscribe.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Prompts {
    /// Prompts for title generation.
    pub titles: TitlePrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for title generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TitlePrompts {
    pub system: String,
    pub user: String,
}

impl Default for TitlePrompts {
    fn default() -> Self {
        Self {
            system: "You are a helpful assistant that creates engaging titles for audio content."
                .to_string(),

            user: r#"Create a catchy, descriptive title (max {{max_chars}} characters) for this audio excerpt.
Focus on the main topic, theme, or memorable moment from the audio.
Make it engaging and descriptive of the content. Avoid generic titles.

Transcript: "{{transcript}}"
Original filename: {{filename}}

Return only the title, nothing else."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let titles_path = custom_path.join("titles.toml");
            if titles_path.exists() {
                let content = std::fs::read_to_string(&titles_path)?;
                prompts.titles = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
