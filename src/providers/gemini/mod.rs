use crate::core::error::AiError;
use crate::providers::{
    Capabilities, ChatRequest, ImageGeneration, ImageRequest, LLMProvider, ProviderReply, catalog,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

mod client;
mod types;

pub use client::GeminiClient;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.0-flash-preview-image-generation";

const MODELS: &[&str] = &[
    "gemini-2.5-pro",
    "gemini-2.5-flash",
    "gemini-2.0-flash",
    "gemini-2.0-flash-lite",
    "gemini-2.0-flash-preview-image-generation",
    "gemini-1.5-pro",
    "gemini-1.5-flash",
];

/// Multimodal provider: chat plus image generation.
#[derive(Clone)]
pub struct GeminiProvider {
    client: GeminiClient,
    model: String,
}

impl GeminiProvider {
    pub fn with_endpoint(
        endpoint: String,
        api_key: String,
        model: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, AiError> {
        Ok(Self {
            client: GeminiClient::new(endpoint, api_key, timeout)?,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn available_models(&self) -> Vec<String> {
        catalog(MODELS)
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            image_generation: true,
        }
    }

    async fn send_message(&self, request: &ChatRequest<'_>) -> Result<ProviderReply, AiError> {
        self.client.generate_content(request).await
    }

    async fn generate_image(&self, request: &ImageRequest<'_>) -> Result<ImageGeneration, AiError> {
        info!(provider = "gemini", model = request.model, "generating image");
        let images = self.client.generate_images(request).await?;
        Ok(ImageGeneration {
            images,
            provider: "gemini".to_string(),
            model: request.model.to_string(),
        })
    }

    fn default_image_model(&self) -> Option<&str> {
        Some(DEFAULT_IMAGE_MODEL)
    }
}
