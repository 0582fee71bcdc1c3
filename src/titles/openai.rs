//! OpenAI chat completion title provider.

use super::TitleProvider;
use crate::error::{ClipscribeError, Result};
use crate::openai::map_error;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use tracing::{debug, instrument};

const MAX_TOKENS: u32 = 100;

/// Title provider backed by an OpenAI chat model.
pub struct OpenAITitleProvider {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAITitleProvider {
    /// Use an existing client.
    pub fn with_client(client: Client<OpenAIConfig>, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl TitleProvider for OpenAITitleProvider {
    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, system, prompt), fields(model = %self.model))]
    async fn generate(&self, system: &str, prompt: &str) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system.to_string())
                .build()
                .map_err(|e| ClipscribeError::TitleGeneration(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt.to_string())
                .build()
                .map_err(|e| ClipscribeError::TitleGeneration(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_tokens(MAX_TOKENS)
            .temperature(0.7)
            .build()
            .map_err(|e| ClipscribeError::TitleGeneration(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| map_error("Title generation", e))?;

        let text = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| ClipscribeError::TitleGeneration("Empty response from model".to_string()))?
            .clone();

        debug!("Received {} chars", text.chars().count());
        Ok(text)
    }
}
