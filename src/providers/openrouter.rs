use super::{ChatRequest, LLMProvider, ProviderReply, catalog};
use crate::core::error::AiError;
use crate::providers::base_client::HttpClient;
use crate::providers::openai_style::{OpenAIStyleClient, TokenLimitField};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "anthropic/claude-3.5-sonnet";

const MODELS: &[&str] = &[
    "anthropic/claude-3.5-sonnet",
    "anthropic/claude-3-opus",
    "openai/gpt-4",
    "openai/gpt-4-turbo",
    "meta-llama/llama-3.1-70b-instruct",
    "google/gemini-pro-1.5",
    "mistralai/mistral-large",
];

#[derive(Clone)]
pub struct OpenRouterProvider {
    client: OpenAIStyleClient,
    model: String,
}

impl OpenRouterProvider {
    pub fn with_endpoint(
        endpoint: String,
        api_key: String,
        model: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, AiError> {
        // OpenRouter attributes traffic by these two headers.
        let mut extra_headers = HashMap::new();
        extra_headers.insert(
            "HTTP-Referer".to_string(),
            "https://github.com/techne-editor/techne".to_string(),
        );
        extra_headers.insert("X-Title".to_string(), "Techne".to_string());

        let http = HttpClient::new(
            "openrouter",
            endpoint,
            Some(("Authorization".to_string(), format!("Bearer {}", api_key))),
            Some(extra_headers),
            timeout,
        )?;
        Ok(Self {
            client: OpenAIStyleClient::new("openrouter", http, TokenLimitField::MaxTokens),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }
}

#[async_trait]
impl LLMProvider for OpenRouterProvider {
    fn name(&self) -> &str {
        "openrouter"
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
