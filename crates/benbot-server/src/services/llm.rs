use async_trait::async_trait;
use serde::Serialize;

use crate::config::LlmConfig;
use crate::services::conversation::{Message, Role};
use crate::utils::error::ApiError;

/// Sampling parameters for one completion
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub top_k: u32,
}

impl GenerationParams {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            top_p: config.top_p,
            top_k: config.top_k,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub model: String,
    /// Rough estimate, ~4 characters per token
    pub tokens_used: usize,
}

/// Hosted text-completion API
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<Completion, ApiError>;

    fn model_name(&self) -> String;

    fn is_configured(&self) -> bool;
}

/// Reply used when the model call fails, so the chat endpoint still answers
pub const FALLBACK_REPLY: &str = "BenBot: Hello! I'm online. Your message was received.";

/// Plain transcript of the context window followed by the assistant cue
pub fn render_transcript(messages: &[Message]) -> String {
    let mut prompt = String::new();
    for message in messages {
        let speaker = match message.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
        };
        prompt.push_str(speaker);
        prompt.push_str(": ");
        prompt.push_str(message.content.trim());
        prompt.push('\n');
    }
    prompt.push_str("Assistant:");
    prompt
}
