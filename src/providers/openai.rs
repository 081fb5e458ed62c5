use super::{
    Capabilities, ChatRequest, GeneratedImage, ImageData, ImageGeneration, ImageRequest,
    LLMProvider, ProviderReply, catalog,
};
use crate::core::error::AiError;
use crate::providers::base_client::HttpClient;
use crate::providers::openai_style::{OpenAIStyleClient, TokenLimitField};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

pub const DEFAULT_MODEL: &str = "gpt-5-mini";
pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";

const MODELS: &[&str] = &[
    "gpt-5",
    "gpt-5-mini",
    "gpt-5-nano",
    "gpt-4",
    "gpt-4-turbo",
    "gpt-4o",
    "gpt-4o-mini",
    "gpt-3.5-turbo",
];

#[derive(Serialize)]
struct ImageGenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<&'a str>,
    response_format: &'static str,
}

#[derive(Deserialize)]
struct ImageGenerationResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
    url: Option<String>,
}

#[derive(Clone)]
pub struct OpenAIProvider {
    client: OpenAIStyleClient,
    model: String,
}

impl OpenAIProvider {
    pub fn new(api_key: String, model: Option<String>) -> Result<Self, AiError> {
        Self::with_endpoint("https://api.openai.com/v1".to_string(), api_key, model, None)
    }

    pub fn with_endpoint(
        endpoint: String,
        api_key: String,
        model: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, AiError> {
        let http = HttpClient::new(
            "openai",
            endpoint,
            Some(("Authorization".to_string(), format!("Bearer {}", api_key))),
            None,
            timeout,
        )?;
        Ok(Self {
            client: OpenAIStyleClient::new("openai", http, TokenLimitField::MaxCompletionTokens),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
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
        self.client.complete(request).await
    }

    async fn generate_image(&self, request: &ImageRequest<'_>) -> Result<ImageGeneration, AiError> {
        info!(provider = "openai", model = request.model, "generating image");
        let payload = ImageGenerationRequest {
            model: request.model,
            prompt: request.prompt,
            n: request.count.max(1),
            size: request.size,
            response_format: "b64_json",
        };

        let parsed: ImageGenerationResponse = self
            .client
            .http()
            .post_json("images/generations", &payload)
            .await?;

        let images: Vec<GeneratedImage> = parsed
            .data
            .into_iter()
            .filter_map(|d| {
                let data = match (d.b64_json, d.url) {
                    (Some(b64), _) => ImageData::Base64(b64),
                    (None, Some(url)) => ImageData::Url(url),
                    (None, None) => return None,
                };
                Some(GeneratedImage {
                    mime_type: "image/png".to_string(),
                    data,
                })
            })
            .collect();

        if images.is_empty() {
            return Err(AiError::InvalidResponse {
                provider: "openai".to_string(),
                detail: "No images in API response".to_string(),
            });
        }

        Ok(ImageGeneration {
            images,
            provider: "openai".to_string(),
            model: request.model.to_string(),
        })
    }

    fn default_image_model(&self) -> Option<&str> {
        Some(DEFAULT_IMAGE_MODEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let provider = OpenAIProvider::new("sk-test".to_string(), None).unwrap();
        assert_eq!(provider.default_model(), DEFAULT_MODEL);
        assert!(provider.capabilities().image_generation);
        assert_eq!(provider.available_models().len(), MODELS.len());
    }

    #[test]
    fn test_model_override() {
        let provider = OpenAIProvider::new("sk-test".to_string(), Some("gpt-4o".to_string())).unwrap();
        assert_eq!(provider.default_model(), "gpt-4o");
    }

    #[test]
    fn test_image_payload_shape() {
        let payload = ImageGenerationRequest {
            model: DEFAULT_IMAGE_MODEL,
            prompt: "a lighthouse",
            n: 1,
            size: Some("1024x1024"),
            response_format: "b64_json",
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["model"], "dall-e-3");
        assert_eq!(json["size"], "1024x1024");
        assert_eq!(json["response_format"], "b64_json");
    }
}
