use crate::core::error::AiError;
use crate::providers::base_client::HttpClient;
use crate::providers::{ChatRequest, ProviderReply, Role, Usage};
use serde::{Deserialize, Serialize};

/// Which field carries the output budget. OpenAI's newer models reject `max_tokens`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenLimitField {
    MaxTokens,
    MaxCompletionTokens,
}

#[derive(Serialize)]
pub(crate) struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatCompletionMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
}

#[derive(Serialize, Debug, PartialEq)]
pub(crate) struct ChatCompletionMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<CompletionUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    content: Option<String>,
}

#[derive(Deserialize)]
struct CompletionUsage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    total_tokens: Option<u32>,
}

/// Chat-completions client for every backend speaking the OpenAI envelope:
/// system prompt as the leading list entry, then history, then the new turn.
#[derive(Clone)]
pub struct OpenAIStyleClient {
    client: HttpClient,
    provider: String,
    token_field: TokenLimitField,
}

impl OpenAIStyleClient {
    pub fn new(provider: &str, client: HttpClient, token_field: TokenLimitField) -> Self {
        Self {
            client,
            provider: provider.to_string(),
            token_field,
        }
    }

    pub fn http(&self) -> &HttpClient {
        &self.client
    }

    pub(crate) fn build_payload<'a>(&self, request: &'a ChatRequest<'a>) -> ChatCompletionRequest<'a> {
        let mut messages = Vec::with_capacity(request.conversation_history.len() + 2);
        if !request.system_message.is_empty() {
            messages.push(ChatCompletionMessage {
                role: Role::System.as_str(),
                content: request.system_message,
            });
        }
        for m in request.conversation_history {
            messages.push(ChatCompletionMessage {
                role: m.role.as_str(),
                content: &m.content,
            });
        }
        messages.push(ChatCompletionMessage {
            role: Role::User.as_str(),
            content: request.message,
        });

        let (max_tokens, max_completion_tokens) = match self.token_field {
            TokenLimitField::MaxTokens => (Some(request.max_tokens), None),
            TokenLimitField::MaxCompletionTokens => (None, Some(request.max_tokens)),
        };

        ChatCompletionRequest {
            model: request.model,
            messages,
            temperature: request.temperature,
            max_tokens,
            max_completion_tokens,
        }
    }

    pub async fn complete(&self, request: &ChatRequest<'_>) -> Result<ProviderReply, AiError> {
        request.log_outbound(&self.provider);
        let payload = self.build_payload(request);
        let parsed: ChatCompletionResponse =
            self.client.post_json("chat/completions", &payload).await?;
        self.into_reply(parsed, request.model)
    }

    fn into_reply(
        &self,
        parsed: ChatCompletionResponse,
        requested_model: &str,
    ) -> Result<ProviderReply, AiError> {
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AiError::InvalidResponse {
                provider: self.provider.clone(),
                detail: "No choices in API response".to_string(),
            })?;

        let usage = parsed.usage.map(|u| {
            let mut usage = Usage::new(u.prompt_tokens, u.completion_tokens);
            if u.total_tokens.is_some() {
                usage.total_tokens = u.total_tokens;
            }
            usage
        });

        Ok(ProviderReply {
            content: choice.message.content.unwrap_or_default().trim().to_string(),
            model: parsed
                .model
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| requested_model.to_string()),
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::Message;

    fn client(field: TokenLimitField) -> OpenAIStyleClient {
        let http = HttpClient::new("test", "http://localhost".to_string(), None, None, None).unwrap();
        OpenAIStyleClient::new("test", http, field)
    }

    #[test]
    fn test_payload_orders_system_history_then_message() {
        let history = vec![Message::user("first"), Message::assistant("reply")];
        let request = ChatRequest {
            message: "second",
            model: "gpt-4o",
            system_message: "be brief",
            temperature: 0.5,
            max_tokens: 300,
            conversation_history: &history,
            verbose: false,
        };
        let c = client(TokenLimitField::MaxTokens);
        let payload = c.build_payload(&request);
        let roles: Vec<&str> = payload.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(payload.messages[3].content, "second");

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["max_tokens"], 300);
        assert!(json.get("max_completion_tokens").is_none());
    }

    #[test]
    fn test_payload_uses_max_completion_tokens_when_asked() {
        let request = ChatRequest {
            message: "hi",
            model: "gpt-5-mini",
            system_message: "",
            temperature: 0.7,
            max_tokens: 2000,
            conversation_history: &[],
            verbose: false,
        };
        let payload = client(TokenLimitField::MaxCompletionTokens).build_payload(&request);
        assert_eq!(payload.messages.len(), 1);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["max_completion_tokens"], 2000);
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_reply_reports_actual_model_and_usage() {
        let body = r#"{
            "model": "gpt-4o-2024-08-06",
            "choices": [{"message": {"role": "assistant", "content": "  Hello!  "}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        }"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        let reply = client(TokenLimitField::MaxTokens)
            .into_reply(parsed, "gpt-4o")
            .unwrap();
        assert_eq!(reply.content, "Hello!");
        assert_eq!(reply.model, "gpt-4o-2024-08-06");
        assert_eq!(reply.usage.unwrap().total_tokens, Some(15));
    }

    #[test]
    fn test_reply_without_usage_or_model() {
        let body = r#"{"choices": [{"message": {"content": "ok"}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        let reply = client(TokenLimitField::MaxTokens)
            .into_reply(parsed, "local-model")
            .unwrap();
        assert_eq!(reply.model, "local-model");
        assert!(reply.usage.is_none());
    }

    #[test]
    fn test_empty_choices_is_invalid_response() {
        let parsed: ChatCompletionResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        let err = client(TokenLimitField::MaxTokens)
            .into_reply(parsed, "m")
            .unwrap_err();
        assert!(matches!(err, AiError::InvalidResponse { .. }));
    }
}
