use super::{ChatRequest, LLMProvider, ProviderReply, catalog};
use crate::core::error::AiError;
use crate::providers::base_client::HttpClient;
use crate::providers::openai_style::{OpenAIStyleClient, TokenLimitField};
use async_trait::async_trait;
use reqwest::Url;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "local-model";
/// Local models can take a while to load on first use.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

const MODELS: &[&str] = &[
    "local-model",
    "llama-3.1-8b-instruct",
    "mistral-7b-instruct",
    "qwen2.5-7b-instruct",
];

/// Normalize a user-supplied server URL: trailing slashes dropped and the
/// `/v1` API prefix appended when missing.
pub fn normalize_base_url(raw: &str) -> Result<String, AiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AiError::Config("local AI URL is empty".to_string()));
    }
    let url = Url::parse(trimmed)
        .map_err(|e| AiError::Config(format!("invalid local AI URL '{}': {}", trimmed, e)))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(AiError::Config(format!(
            "local AI URL '{}' must be an http(s) address",
            trimmed
        )));
    }

    let mut base = trimmed.trim_end_matches('/').to_string();
    if !base.ends_with("/v1") {
        base.push_str("/v1");
    }
    Ok(base)
}

/// OpenAI-compatible server on the user's machine (LM Studio, Ollama,
/// llama.cpp). No authentication.
#[derive(Clone)]
pub struct LocalProvider {
    client: OpenAIStyleClient,
    model: String,
}

impl LocalProvider {
    pub fn new(
        base_url: &str,
        model: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, AiError> {
        let base_url = normalize_base_url(base_url)?;
        let http = HttpClient::new(
            "local",
            base_url,
            None,
            None,
            Some(timeout.unwrap_or(DEFAULT_TIMEOUT)),
        )?
        .local();
        Ok(Self {
            client: OpenAIStyleClient::new("local", http, TokenLimitField::MaxTokens),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    pub fn base_url(&self) -> &str {
        self.client.http().base_url()
    }
}

#[async_trait]
impl LLMProvider for LocalProvider {
    fn name(&self) -> &str {
        "local"
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
