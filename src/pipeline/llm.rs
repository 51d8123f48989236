//! Model invocation: submit a [`PromptDocument`] and return the raw reply.
//!
//! One call, no retry. Any provider error (network, quota, auth, content
//! filter) becomes [`ExtractError::LlmApiError`] and ends the pipeline; the
//! caller decides whether to run it again.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::prompts::PromptDocument;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Untrusted text returned by the model, plus usage figures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawModelResponse {
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl RawModelResponse {
    /// A response with no usage information.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            input_tokens: 0,
            output_tokens: 0,
        }
    }
}

/// Capability to run a prompt through a generative model.
#[async_trait]
pub trait RecipeGenerator: Send + Sync {
    async fn generate(&self, prompt: &PromptDocument) -> Result<RawModelResponse, ExtractError>;
}

/// [`RecipeGenerator`] backed by an `edgequake-llm` provider.
pub struct LlmGenerator {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl LlmGenerator {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ExtractionConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
        }
    }
}

#[async_trait]
impl RecipeGenerator for LlmGenerator {
    async fn generate(&self, prompt: &PromptDocument) -> Result<RawModelResponse, ExtractError> {
        let start = Instant::now();
        let messages = build_messages(prompt);

        match self.provider.chat(&messages, Some(&self.options)).await {
            Ok(response) => {
                debug!(
                    "Model answered: {} input tokens, {} output tokens, {:?}",
                    response.prompt_tokens,
                    response.completion_tokens,
                    start.elapsed()
                );
                Ok(RawModelResponse {
                    text: response.content,
                    input_tokens: response.prompt_tokens,
                    output_tokens: response.completion_tokens,
                })
            }
            Err(e) => {
                warn!("Model call failed after {:?}: {}", start.elapsed(), e);
                Err(ExtractError::LlmApiError {
                    message: e.to_string(),
                })
            }
        }
    }
}

/// One user turn: the prompt text, with the photo attached on the image path.
fn build_messages(prompt: &PromptDocument) -> Vec<ChatMessage> {
    match &prompt.image {
        Some(image) => vec![ChatMessage::user_with_images(
            prompt.text.as_str(),
            vec![image.clone()],
        )],
        None => vec![ChatMessage::user(prompt.text.as_str())],
    }
}

/// Build `CompletionOptions` from the extraction config.
fn build_options(config: &ExtractionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgequake_llm::ImageData;

    #[test]
    fn build_options_defaults() {
        let config = ExtractionConfig::default();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.1));
        assert_eq!(opts.max_tokens, Some(2048));
    }

    #[test]
    fn text_prompt_is_single_user_message() {
        let prompt = PromptDocument {
            text: "extract this".to_string(),
            image: None,
        };
        let messages = build_messages(&prompt);
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn image_prompt_attaches_image() {
        let prompt = PromptDocument {
            text: "read the photo".to_string(),
            image: Some(ImageData::new("aGVsbG8=".to_string(), "image/png")),
        };
        let messages = build_messages(&prompt);
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn raw_response_from_text_has_no_usage() {
        let r = RawModelResponse::from_text("{}");
        assert_eq!(r.text, "{}");
        assert_eq!(r.input_tokens + r.output_tokens, 0);
    }
}
