use super::{ChatRequest, LLMProvider, ProviderReply, catalog};
use crate::core::error::AiError;
use crate::providers::base_client::HttpClient;
use crate::providers::openai_style::{OpenAIStyleClient, TokenLimitField};
use async_trait::async_trait;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "llama-3.1-70b-versatile";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const MODELS: &[&str] = &[
    "llama-3.1-70b-versatile",
    "llama-3.1-8b-instant",
    "llama-3.2-90b-text-preview",
    "llama-3.2-11b-text-preview",
    "mixtral-8x7b-32768",
    "gemma2-9b-it",
];

#[derive(Clone)]
pub struct GroqProvider {
    client: OpenAIStyleClient,
    model: String,
}

impl GroqProvider {
    pub fn with_endpoint(
        endpoint: String,
        api_key: String,
        model: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, AiError> {
        let http = HttpClient::new(
            "groq",
            endpoint,
            Some(("Authorization".to_string(), format!("Bearer {}", api_key))),
            None,
            Some(timeout.unwrap_or(DEFAULT_TIMEOUT)),
        )?;
        Ok(Self {
            client: OpenAIStyleClient::new("groq", http, TokenLimitField::MaxTokens),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }
}

#[async_trait]
impl LLMProvider for GroqProvider {
    fn name(&self) -> &str {
        "groq"
    }

    fn available_models(&self) -> Vec<String> {
        catalog(MODELS)
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn send_message(&self, request: &ChatRequest<'_>) -> Result<ProviderReply, AiError> {
        self.client.complete(request).await
    }
}
