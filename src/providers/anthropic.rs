use crate::core::error::AiError;
use crate::providers::base_client::HttpClient;
use crate::providers::{ChatRequest, LLMProvider, ProviderReply, Role, Usage, catalog};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
const API_VERSION: &str = "2023-06-01";

const MODELS: &[&str] = &[
    "claude-opus-4-1-20250805",
    "claude-opus-4-20250514",
    "claude-sonnet-4-20250514",
    "claude-3-7-sonnet-20250219",
    "claude-3-5-sonnet-20241022",
    "claude-3-5-haiku-20241022",
    "claude-3-opus-20240229",
    "claude-3-sonnet-20240229",
    "claude-3-haiku-20240307",
];

#[derive(Clone)]
pub struct AnthropicProvider {
    client: HttpClient,
    model: String,
}

impl AnthropicProvider {
    pub fn with_endpoint(
        endpoint: String,
        api_key: String,
        model: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, AiError> {
        let mut extra_headers = HashMap::new();
        extra_headers.insert("anthropic-version".to_string(), API_VERSION.to_string());
        Ok(Self {
            client: HttpClient::new(
                "anthropic",
                endpoint,
                Some(("x-api-key".to_string(), api_key)),
                Some(extra_headers),
                timeout,
            )?,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    fn build_payload<'a>(request: &'a ChatRequest<'a>) -> AnthropicRequest<'a> {
        // The system prompt travels in its own field, never in `messages`.
        let mut messages: Vec<AnthropicMessage<'a>> = request
            .conversation_history
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| AnthropicMessage {
                role: m.role.as_str(),
                content: &m.content,
            })
            .collect();
        messages.push(AnthropicMessage {
            role: Role::User.as_str(),
            content: request.message,
        });

        AnthropicRequest {
            model: request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages,
            system: Some(request.system_message).filter(|s| !s.is_empty()),
        }
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn available_models(&self) -> Vec<String> {
        catalog(MODELS)
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn send_message(&self, request: &ChatRequest<'_>) -> Result<ProviderReply, AiError> {
        request.log_outbound("anthropic");
        let payload = Self::build_payload(request);
        let parsed: AnthropicResponse = self.client.post_json("messages", &payload).await?;
        parsed.into_reply(request.model)
    }
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<AnthropicMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    model: Option<String>,
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<AnthropicUsage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: Option<u32>,
    output_tokens: Option<u32>,
}

impl AnthropicResponse {
    fn into_reply(self, requested_model: &str) -> Result<ProviderReply, AiError> {
        let text: Vec<String> = self
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        if text.is_empty() {
            return Err(AiError::InvalidResponse {
                provider: "anthropic".to_string(),
                detail: "Empty response from Anthropic".to_string(),
            });
        }

        Ok(ProviderReply {
            content: text.join(""),
            model: self.model.unwrap_or_else(|| requested_model.to_string()),
            usage: self
                .usage
                .map(|u| Usage::new(u.input_tokens, u.output_tokens)),
        })
    }
}
