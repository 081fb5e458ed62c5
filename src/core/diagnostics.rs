//! Turns transport failures into stable, actionable errors.
//!
//! Hosted vendors get a short description of what went wrong. The local
//! OpenAI-compatible server gets the configured URL and a checklist, since a
//! failure there almost always means the server is not running or the URL is
//! wrong.

use crate::core::error::AiError;
use std::error::Error as StdError;
use std::fmt;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkFailure {
    ConnectionRefused,
    DnsResolution,
    ConnectionReset,
    Timeout,
    Other,
}

impl NetworkFailure {
    pub fn describe(&self) -> &'static str {
        match self {
            NetworkFailure::ConnectionRefused => "connection refused",
            NetworkFailure::DnsResolution => "host name could not be resolved",
            NetworkFailure::ConnectionReset => "connection was reset",
            NetworkFailure::Timeout => "request timed out",
            NetworkFailure::Other => "request failed",
        }
    }

    /// Headline for a failure against the local server at `url`.
    pub fn local_headline(&self, url: &str) -> String {
        match self {
            NetworkFailure::ConnectionRefused => format!(
                "Connection refused at {url}. Is your local AI server running at {url}?"
            ),
            NetworkFailure::DnsResolution => format!(
                "Could not resolve the host in {url}. Check the local AI server URL for typos."
            ),
            NetworkFailure::ConnectionReset => format!(
                "The local AI server at {url} closed the connection. It may have crashed or run out of memory."
            ),
            NetworkFailure::Timeout => format!(
                "The local AI server at {url} did not respond in time. The model may still be loading."
            ),
            NetworkFailure::Other => format!("Could not talk to the local AI server at {url}."),
        }
    }

    /// Likely causes, most probable first.
    pub fn local_checklist(&self) -> Vec<&'static str> {
        match self {
            NetworkFailure::ConnectionRefused => vec![
                "Start your local AI server (LM Studio, Ollama, llama.cpp)",
                "Check that the server listens on the configured port",
                "Verify the Local AI URL in settings",
            ],
            NetworkFailure::DnsResolution => vec![
                "Use localhost or 127.0.0.1 for a server on this machine",
                "Verify the Local AI URL in settings",
            ],
            NetworkFailure::ConnectionReset => vec![
                "Check the server log for a crash",
                "Try a smaller model or shorter conversation",
                "Restart the local AI server",
            ],
            NetworkFailure::Timeout => vec![
                "Wait for the model to finish loading, then retry",
                "Try a smaller model or lower the max tokens setting",
            ],
            NetworkFailure::Other => vec![
                "Start your local AI server",
                "Verify the Local AI URL in settings",
            ],
        }
    }
}

/// Network failure enriched with the endpoint it was aimed at.
#[derive(Debug, Clone)]
pub struct NetworkError {
    pub provider: String,
    pub endpoint: String,
    pub failure: NetworkFailure,
    pub detail: String,
    local: bool,
}

impl NetworkError {
    pub fn new(
        provider: impl Into<String>,
        endpoint: impl Into<String>,
        failure: NetworkFailure,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            endpoint: endpoint.into(),
            failure,
            detail: detail.into(),
            local: false,
        }
    }

    pub fn local(mut self) -> Self {
        self.local = true;
        self
    }

    pub fn is_local(&self) -> bool {
        self.local
    }
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.local {
            write!(f, "{}", self.failure.local_headline(&self.endpoint))?;
            for hint in self.failure.local_checklist() {
                write!(f, "\n  - {}", hint)?;
            }
            Ok(())
        } else {
            write!(
                f,
                "Network error contacting {} ({}): {}: {}",
                self.provider,
                self.endpoint,
                self.failure.describe(),
                self.detail
            )
        }
    }
}

/// Classify a transport error by walking its source chain.
pub fn classify(err: &reqwest::Error) -> NetworkFailure {
    if err.is_timeout() {
        return NetworkFailure::Timeout;
    }

    let mut source: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(inner) = source {
        if let Some(io_err) = inner.downcast_ref::<io::Error>() {
            if let Some(failure) = classify_io(io_err.kind()) {
                return failure;
            }
        }
        if let Some(failure) = classify_message(&inner.to_string()) {
            return failure;
        }
        source = inner.source();
    }

    classify_message(&err.to_string()).unwrap_or(NetworkFailure::Other)
}

pub fn classify_io(kind: io::ErrorKind) -> Option<NetworkFailure> {
    match kind {
        io::ErrorKind::ConnectionRefused => Some(NetworkFailure::ConnectionRefused),
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof => Some(NetworkFailure::ConnectionReset),
        io::ErrorKind::TimedOut => Some(NetworkFailure::Timeout),
        _ => None,
    }
}

/// Fallback for errors that only carry text (resolver and hyper errors).
pub fn classify_message(message: &str) -> Option<NetworkFailure> {
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("dns error")
        || lowered.contains("failed to lookup address")
        || lowered.contains("name or service not known")
        || lowered.contains("no such host")
    {
        Some(NetworkFailure::DnsResolution)
    } else if lowered.contains("connection refused") {
        Some(NetworkFailure::ConnectionRefused)
    } else if lowered.contains("connection reset")
        || lowered.contains("connection closed")
        || lowered.contains("broken pipe")
    {
        Some(NetworkFailure::ConnectionReset)
    } else if lowered.contains("timed out") {
        Some(NetworkFailure::Timeout)
    } else {
        None
    }
}

/// Normalize a reqwest transport error. The URL is dropped from the detail so
/// credentials passed as query parameters never reach logs or the UI.
pub fn transport_error(provider: &str, endpoint: &str, err: reqwest::Error, local: bool) -> AiError {
    let failure = classify(&err);
    let detail = err.without_url().to_string();
    let net = NetworkError::new(provider, endpoint, failure, detail);
    AiError::Network(if local { net.local() } else { net })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_io_kinds() {
        assert_eq!(
            classify_io(io::ErrorKind::ConnectionRefused),
            Some(NetworkFailure::ConnectionRefused)
        );
        assert_eq!(
            classify_io(io::ErrorKind::ConnectionReset),
            Some(NetworkFailure::ConnectionReset)
        );
        assert_eq!(classify_io(io::ErrorKind::TimedOut), Some(NetworkFailure::Timeout));
        assert_eq!(classify_io(io::ErrorKind::PermissionDenied), None);
    }

    #[test]
    fn test_classify_message_dns() {
        assert_eq!(
            classify_message("dns error: failed to lookup address information"),
            Some(NetworkFailure::DnsResolution)
        );
        assert_eq!(
            classify_message("connection closed before message completed"),
            Some(NetworkFailure::ConnectionReset)
        );
        assert_eq!(classify_message("something odd"), None);
    }

    #[test]
    fn test_local_refused_mentions_url_and_action() {
        let err = NetworkError::new(
            "local",
            "http://localhost:1234/v1",
            NetworkFailure::ConnectionRefused,
            "tcp connect error",
        )
        .local();
        let msg = err.to_string();
        assert!(msg.contains("http://localhost:1234/v1"));
        assert!(msg.contains("Is your local AI server running"));
        assert!(msg.contains("Start your local AI server"));
    }

    #[test]
    fn test_local_failures_have_distinct_headlines() {
        let url = "http://127.0.0.1:8080/v1";
        let kinds = [
            NetworkFailure::ConnectionRefused,
            NetworkFailure::DnsResolution,
            NetworkFailure::ConnectionReset,
            NetworkFailure::Timeout,
        ];
        let headlines: Vec<String> = kinds.iter().map(|k| k.local_headline(url)).collect();
        for (i, a) in headlines.iter().enumerate() {
            assert!(a.contains(url));
            for b in headlines.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_remote_network_error_display() {
        let err = NetworkError::new(
            "openai",
            "https://api.openai.com/v1/chat/completions",
            NetworkFailure::Timeout,
            "operation timed out",
        );
        let msg = err.to_string();
        assert!(msg.contains("openai"));
        assert!(msg.contains("request timed out"));
        assert!(!err.is_local());
    }
}
