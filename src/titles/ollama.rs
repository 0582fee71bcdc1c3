//! Local title generation through an Ollama server.

use super::TitleProvider;
use crate::error::{ClipscribeError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Title provider that calls `/api/generate` on an Ollama server.
pub struct OllamaTitleProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaTitleProvider {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }
}

#[async_trait]
impl TitleProvider for OllamaTitleProvider {
    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, system, prompt), fields(model = %self.model))]
    async fn generate(&self, system: &str, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            system: (!system.is_empty()).then_some(system),
            stream: false,
        };

        let response = self
            .client
            .post(self.generate_url())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClipscribeError::TitleGeneration(format!(
                "Ollama returned {}",
                response.status()
            )));
        }

        let body: GenerateResponse = response.json().await?;
        debug!("Received {} chars", body.response.chars().count());
        Ok(body.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_url_strips_trailing_slash() {
        let provider =
            OllamaTitleProvider::new("http://localhost:11434/", "llama3.2", Duration::from_secs(5))
                .unwrap();
        assert_eq!(provider.generate_url(), "http://localhost:11434/api/generate");
        assert_eq!(provider.model(), "llama3.2");
    }

    #[test]
    fn test_request_shape() {
        let request = GenerateRequest {
            model: "llama3.2",
            prompt: "Title this",
            system: None,
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], false);
        assert!(json.get("system").is_none());
    }
}
