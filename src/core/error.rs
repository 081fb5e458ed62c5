use crate::core::diagnostics::NetworkError;
use std::io;
use thiserror::Error;

/// Unified error type for the provider orchestration layer
#[derive(Error, Debug)]
pub enum AiError {
    /// Missing or invalid credentials/settings while constructing a provider
    #[error("Configuration error: {0}")]
    Config(String),

    /// The caller named a provider that is not registered
    #[error(
        "Provider '{name}' not available. Available providers: {}",
        list_or_none(available)
    )]
    ProviderUnavailable {
        name: String,
        available: Vec<String>,
    },

    /// Nothing registered at all
    #[error("No AI providers configured")]
    NoProviderConfigured,

    /// Connection refused, DNS failure, reset or timeout
    #[error("{0}")]
    Network(NetworkError),

    /// Non-success HTTP status from a vendor
    #[error("{provider} API error: {status} - {body}")]
    Upstream {
        provider: String,
        status: u16,
        body: String,
    },

    /// Operation the provider does not implement
    #[error("Provider '{provider}' does not support {operation}")]
    Capability {
        provider: String,
        operation: &'static str,
    },

    /// The vendor answered 2xx but the envelope was unusable
    #[error("Invalid response from {provider}: {detail}")]
    InvalidResponse { provider: String, detail: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// User input errors
    #[error("Input error: {0}")]
    Input(String),

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

/// Stable taxonomy of failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    ProviderUnavailable,
    NoProviderConfigured,
    Network,
    Upstream,
    Capability,
    InvalidResponse,
    Other,
}

/// What the user can do about a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Add or fix credentials / provider selection
    NotConfigured,
    /// Transient or upstream failure, retrying may help
    Retryable,
    /// The local AI server could not be reached
    LocalServerUnreachable,
    /// The provider lacks the requested capability
    Unsupported,
    /// Anything caused by the request itself
    Invalid,
}

impl AiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AiError::Config(_) => ErrorKind::Configuration,
            AiError::ProviderUnavailable { .. } => ErrorKind::ProviderUnavailable,
            AiError::NoProviderConfigured => ErrorKind::NoProviderConfigured,
            AiError::Network(_) => ErrorKind::Network,
            AiError::Upstream { .. } => ErrorKind::Upstream,
            AiError::Capability { .. } => ErrorKind::Capability,
            AiError::InvalidResponse { .. } => ErrorKind::InvalidResponse,
            AiError::Serialization(_) | AiError::Input(_) | AiError::Io { .. } => ErrorKind::Other,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            AiError::Config(_)
            | AiError::ProviderUnavailable { .. }
            | AiError::NoProviderConfigured => ErrorCategory::NotConfigured,
            AiError::Network(net) if net.is_local() => ErrorCategory::LocalServerUnreachable,
            AiError::Network(_) | AiError::InvalidResponse { .. } => ErrorCategory::Retryable,
            AiError::Upstream { status, .. } => match status {
                401 | 403 => ErrorCategory::NotConfigured,
                400 | 404 | 413 | 422 => ErrorCategory::Invalid,
                _ => ErrorCategory::Retryable,
            },
            AiError::Capability { .. } => ErrorCategory::Unsupported,
            AiError::Serialization(_) | AiError::Input(_) | AiError::Io { .. } => {
                ErrorCategory::Invalid
            }
        }
    }

    /// A sentence the host can show as-is, telling the user what to do next.
    pub fn user_message(&self) -> String {
        match self {
            AiError::Config(reason) => format!(
                "AI provider configuration problem: {}. Check your API keys and settings.",
                reason
            ),
            AiError::ProviderUnavailable { name, available } => format!(
                "AI provider '{}' is not configured. Choose one of: {}, or add its API key.",
                name,
                list_or_none(available)
            ),
            AiError::NoProviderConfigured => {
                "No AI provider is configured. Add an API key (e.g. OPENAI_API_KEY) or set LOCAL_AI_URL."
                    .to_string()
            }
            AiError::Network(net) => net.to_string(),
            AiError::Upstream {
                provider,
                status,
                body,
            } => {
                let lowered = body.to_ascii_lowercase();
                match status {
                    401 | 403 => format!(
                        "{} rejected the credentials ({}). Check the API key in your settings.",
                        provider, status
                    ),
                    429 => format!(
                        "{} rate limit exceeded. Wait a moment before sending another message.",
                        provider
                    ),
                    402 => format!("{} reports a billing problem. Check your account.", provider),
                    _ if lowered.contains("quota") || lowered.contains("billing") => format!(
                        "{} quota exceeded or billing issue. Check your account.",
                        provider
                    ),
                    _ => format!(
                        "{} returned an error ({}). Try again; if it persists: {}",
                        provider, status, body
                    ),
                }
            }
            AiError::Capability {
                provider,
                operation,
            } => format!(
                "{} cannot do {}. Pick a provider that supports it.",
                provider, operation
            ),
            AiError::InvalidResponse { provider, .. } => format!(
                "{} sent a response that could not be read. Try again.",
                provider
            ),
            other => other.to_string(),
        }
    }
}

fn list_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

impl From<NetworkError> for AiError {
    fn from(err: NetworkError) -> Self {
        AiError::Network(err)
    }
}

impl From<serde_json::Error> for AiError {
    fn from(err: serde_json::Error) -> Self {
        AiError::Serialization(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_unavailable_lists_names() {
        let err = AiError::ProviderUnavailable {
            name: "nonexistent".to_string(),
            available: vec!["openai".to_string(), "local".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("nonexistent"));
        assert!(msg.contains("openai, local"));
        assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);
        assert_eq!(err.category(), ErrorCategory::NotConfigured);
    }

    #[test]
    fn test_provider_unavailable_with_empty_registry() {
        let err = AiError::ProviderUnavailable {
            name: "openai".to_string(),
            available: Vec::new(),
        };
        assert!(err.to_string().ends_with("none"));
    }

    #[test]
    fn test_upstream_keeps_status_and_body() {
        let err = AiError::Upstream {
            provider: "anthropic".to_string(),
            status: 529,
            body: "{\"error\":\"overloaded\"}".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("529"));
        assert!(msg.contains("overloaded"));
        assert_eq!(err.category(), ErrorCategory::Retryable);
    }

    #[test]
    fn test_upstream_auth_failure_is_configuration_problem() {
        let err = AiError::Upstream {
            provider: "openai".to_string(),
            status: 401,
            body: "invalid api key".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::NotConfigured);
        assert!(err.user_message().contains("API key"));
    }

    #[test]
    fn test_upstream_rate_limit_message() {
        let err = AiError::Upstream {
            provider: "groq".to_string(),
            status: 429,
            body: String::new(),
        };
        assert!(err.user_message().contains("rate limit"));
    }

    #[test]
    fn test_capability_error() {
        let err = AiError::Capability {
            provider: "anthropic".to_string(),
            operation: "image generation",
        };
        assert_eq!(err.kind(), ErrorKind::Capability);
        assert_eq!(err.category(), ErrorCategory::Unsupported);
        assert!(err.to_string().contains("image generation"));
    }

    #[test]
    fn test_no_provider_configured_is_actionable() {
        let err = AiError::NoProviderConfigured;
        assert_eq!(err.to_string(), "No AI providers configured");
        assert!(err.user_message().contains("API key"));
    }
}
