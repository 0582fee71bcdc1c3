//! OpenAI client configuration and credential checks.

use crate::error::{ClipscribeError, Result};
use async_openai::error::OpenAIError;
use async_openai::types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;
use tracing::{debug, instrument};

/// Default timeout for OpenAI API requests (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Environment variable holding the API credential.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Model used for the credential validation call.
const VALIDATION_MODEL: &str = "gpt-3.5-turbo";

/// Create an OpenAI client with the default timeout.
pub fn create_client() -> Result<Client<OpenAIConfig>> {
    create_client_with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create an OpenAI client with a custom timeout.
pub fn create_client_with_timeout(timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;

    Ok(Client::with_config(OpenAIConfig::default()).with_http_client(http_client))
}

/// Map an OpenAI client error onto the crate taxonomy.
///
/// Rejected credentials become `Authentication`; everything else is reported
/// as an API error tagged with `context`.
pub fn map_error(context: &str, err: OpenAIError) -> ClipscribeError {
    match &err {
        OpenAIError::ApiError(api) if looks_like_auth_failure(&api.message) => {
            ClipscribeError::Authentication(api.message.clone())
        }
        _ => ClipscribeError::OpenAI(format!("{}: {}", context, err)),
    }
}

fn looks_like_auth_failure(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("api key") || lower.contains("invalid_api_key") || lower.contains("unauthorized")
}

/// Validate the credential with a minimal chat completion.
///
/// Runs once before a pipeline starts so that a bad key aborts the run
/// instead of failing every file.
#[instrument(skip(client))]
pub async fn validate_credentials(client: &Client<OpenAIConfig>) -> Result<()> {
    let message = ChatCompletionRequestUserMessageArgs::default()
        .content("Hello")
        .build()
        .map_err(|e| ClipscribeError::OpenAI(e.to_string()))?;

    let request = CreateChatCompletionRequestArgs::default()
        .model(VALIDATION_MODEL)
        .messages(vec![message.into()])
        .max_tokens(5_u32)
        .build()
        .map_err(|e| ClipscribeError::OpenAI(e.to_string()))?;

    match client.chat().create(request).await {
        Ok(_) => {
            debug!("API key accepted");
            Ok(())
        }
        Err(e) => match map_error("Credential validation", e) {
            ClipscribeError::Authentication(msg) => Err(ClipscribeError::Authentication(msg)),
            other => Err(ClipscribeError::Authentication(format!(
                "could not validate API key: {}",
                other
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_failure_detection() {
        assert!(looks_like_auth_failure("Incorrect API key provided: sk-xxx"));
        assert!(looks_like_auth_failure("invalid_api_key"));
        assert!(!looks_like_auth_failure("Rate limit reached for requests"));
    }

    #[test]
    fn test_client_creation() {
        assert!(create_client_with_timeout(Duration::from_secs(5)).is_ok());
    }
}
