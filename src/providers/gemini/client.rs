use crate::core::error::AiError;
use crate::providers::base_client::HttpClient;
use crate::providers::gemini::types::*;
use crate::providers::{
    ChatRequest, GeneratedImage, ImageData, ImageRequest, ProviderReply, Role, Usage,
};
use std::time::Duration;

#[derive(Clone)]
pub struct GeminiClient {
    client: HttpClient,
}

impl GeminiClient {
    pub fn new(base_url: String, api_key: String, timeout: Option<Duration>) -> Result<Self, AiError> {
        let mut client = HttpClient::new("gemini", base_url, None, None, timeout)?;

        // Add API key to query params
        client.add_query_param("key", api_key);

        Ok(Self { client })
    }

    pub async fn generate_content(&self, request: &ChatRequest<'_>) -> Result<ProviderReply, AiError> {
        request.log_outbound("gemini");
        let payload = build_payload(request);
        let parsed: GeminiResponse = self
            .client
            .post_json(
                &format!("v1beta/models/{}:generateContent", request.model),
                &payload,
            )
            .await?;
        into_reply(parsed, request.model)
    }

    pub async fn generate_images(
        &self,
        request: &ImageRequest<'_>,
    ) -> Result<Vec<GeneratedImage>, AiError> {
        let payload = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart::text(request.prompt)],
            }],
            system_instruction: None,
            generation_config: GenerationConfig {
                temperature: None,
                max_output_tokens: None,
                response_modalities: Some(vec!["TEXT", "IMAGE"]),
                candidate_count: Some(request.count.max(1)),
            },
        };
        let parsed: GeminiResponse = self
            .client
            .post_json(
                &format!("v1beta/models/{}:generateContent", request.model),
                &payload,
            )
            .await?;

        let images: Vec<GeneratedImage> = parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|content| content.parts)
            .filter_map(|part| part.inline_data)
            .map(|inline| GeneratedImage {
                mime_type: inline.mime_type,
                data: ImageData::Base64(inline.data),
            })
            .collect();

        if images.is_empty() {
            return Err(AiError::InvalidResponse {
                provider: "gemini".to_string(),
                detail: "No image data in Gemini response".to_string(),
            });
        }
        Ok(images)
    }
}

pub(crate) fn build_payload(request: &ChatRequest<'_>) -> GeminiRequest {
    let mut contents: Vec<GeminiContent> = request
        .conversation_history
        .iter()
        .filter_map(|message| {
            let role = match message.role {
                Role::User => "user",
                Role::Assistant => "model",
                Role::System => return None,
            };
            Some(GeminiContent {
                role: Some(role.to_string()),
                parts: vec![GeminiPart::text(message.content.clone())],
            })
        })
        .collect();
    contents.push(GeminiContent {
        role: Some("user".to_string()),
        parts: vec![GeminiPart::text(request.message)],
    });

    let system_instruction = (!request.system_message.is_empty()).then(|| SystemInstruction {
        parts: vec![GeminiPart::text(request.system_message)],
    });

    GeminiRequest {
        contents,
        system_instruction,
        generation_config: GenerationConfig {
            temperature: Some(request.temperature),
            max_output_tokens: Some(request.max_tokens),
            response_modalities: None,
            candidate_count: None,
        },
    }
}

pub(crate) fn into_reply(parsed: GeminiResponse, requested_model: &str) -> Result<ProviderReply, AiError> {
    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.is_empty() {
        return Err(AiError::InvalidResponse {
            provider: "gemini".to_string(),
            detail: "No valid response from Gemini".to_string(),
        });
    }

    let usage = parsed.usage_metadata.map(|u| {
        let mut usage = Usage::new(u.prompt_token_count, u.candidates_token_count);
        if u.total_token_count.is_some() {
            usage.total_tokens = u.total_token_count;
        }
        usage
    });

    Ok(ProviderReply {
        content: text,
        model: parsed
            .model_version
            .unwrap_or_else(|| requested_model.to_string()),
        usage,
    })
}
