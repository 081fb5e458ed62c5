use crate::core::error::AiError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod anthropic;
pub mod base_client;
pub mod factory;
pub mod gemini;
pub mod groq;
pub mod local;
pub mod openai;
pub mod openai_style;
pub mod openrouter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Best-effort token accounting; every field is optional because vendors differ.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

impl Usage {
    pub fn new(prompt_tokens: Option<u32>, completion_tokens: Option<u32>) -> Self {
        let total_tokens = match (prompt_tokens, completion_tokens) {
            (Some(p), Some(c)) => Some(p.saturating_add(c)),
            _ => None,
        };
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.prompt_tokens.is_none()
            && self.completion_tokens.is_none()
            && self.total_tokens.is_none()
    }
}

/// What a provider can do beyond chat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub image_generation: bool,
}

/// One chat call, fully resolved by the orchestrator.
#[derive(Debug, Clone)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
    pub model: &'a str,
    pub system_message: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Prior turns, oldest first, not including `message`.
    pub conversation_history: &'a [Message],
    pub verbose: bool,
}

impl ChatRequest<'_> {
    /// Short preview used in logs.
    pub fn preview(&self) -> String {
        const PREVIEW_CHARS: usize = 200;
        let mut preview: String = self.message.chars().take(PREVIEW_CHARS).collect();
        if self.message.chars().count() > PREVIEW_CHARS {
            preview.push_str("...");
        }
        preview
    }

    pub fn log_outbound(&self, provider: &str) {
        if self.verbose {
            tracing::info!(
                provider,
                model = self.model,
                chars = self.message.len(),
                history = self.conversation_history.len(),
                preview = %self.preview(),
                "sending chat request"
            );
        } else {
            tracing::debug!(
                provider,
                model = self.model,
                chars = self.message.len(),
                history = self.conversation_history.len(),
                "sending chat request"
            );
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderReply {
    pub content: String,
    /// The model the vendor reports, which may differ from the requested alias.
    pub model: String,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone)]
pub struct ImageRequest<'a> {
    pub prompt: &'a str,
    pub model: &'a str,
    pub size: Option<&'a str>,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageData {
    Base64(String),
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedImage {
    pub mime_type: String,
    pub data: ImageData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageGeneration {
    pub images: Vec<GeneratedImage>,
    pub provider: String,
    pub model: String,
}

#[async_trait]
pub trait LLMProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Static catalog, in display order.
    fn available_models(&self) -> Vec<String>;

    fn default_model(&self) -> &str;

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    async fn send_message(&self, request: &ChatRequest<'_>) -> Result<ProviderReply, AiError>;

    async fn generate_image(&self, _request: &ImageRequest<'_>) -> Result<ImageGeneration, AiError> {
        Err(AiError::Capability {
            provider: self.name().to_string(),
            operation: "image generation",
        })
    }

    /// Model used for image generation when the caller does not pick one.
    fn default_image_model(&self) -> Option<&str> {
        None
    }
}

pub(crate) fn catalog(models: &[&str]) -> Vec<String> {
    models.iter().map(|m| m.to_string()).collect()
}
