//! Title provider trait.

use crate::error::Result;
use async_trait::async_trait;

/// A text generation backend that can propose a title.
#[async_trait]
pub trait TitleProvider: Send + Sync {
    /// Model identifier, recorded with generated titles.
    fn model(&self) -> &str;

    /// Return the raw response for a system and user prompt.
    async fn generate(&self, system: &str, prompt: &str) -> Result<String>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted provider used by tests across the crate.

    use super::*;
    use crate::error::ClipscribeError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    enum Reply {
        Text(String),
        Fail,
        Hang,
    }

    /// Provider returning a fixed reply and recording prompts.
    pub struct ScriptedProvider {
        model: String,
        reply: Reply,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn with_reply(model: &str, reply: Reply) -> Self {
            Self {
                model: model.to_string(),
                reply,
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn replying(model: &str, text: &str) -> Self {
            Self::with_reply(model, Reply::Text(text.to_string()))
        }

        pub fn failing(model: &str) -> Self {
            Self::with_reply(model, Reply::Fail)
        }

        /// Never answers; exercises the resolver timeout.
        pub fn hanging(model: &str) -> Self {
            Self::with_reply(model, Reply::Hang)
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn last_prompt(&self) -> Option<String> {
            self.prompts.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl TitleProvider for ScriptedProvider {
        fn model(&self) -> &str {
            &self.model
        }

        async fn generate(&self, _system: &str, prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.reply {
                Reply::Text(text) => Ok(text.clone()),
                Reply::Fail => Err(ClipscribeError::OpenAI("scripted failure".to_string())),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(String::new())
                }
            }
        }
    }
}
