use crate::core::diagnostics;
use crate::core::error::AiError;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Thin JSON-over-HTTP client shared by every provider. One instance per
/// provider binding; the underlying connection pool is reused across calls.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    provider: String,
    base_url: String,
    auth_header: Option<(String, String)>,
    extra_headers: HashMap<String, String>,
    query_params: Vec<(String, String)>,
    local: bool,
}

impl HttpClient {
    pub fn new(
        provider: &str,
        base_url: String,
        auth_header: Option<(String, String)>,
        extra_headers: Option<HashMap<String, String>>,
        timeout: Option<Duration>,
    ) -> Result<Self, AiError> {
        let mut builder = Client::builder();
        if is_loopback(&base_url) {
            builder = builder.no_proxy();
        }
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            AiError::Config(format!("{}: failed to build HTTP client: {}", provider, e))
        })?;

        Ok(Self {
            client,
            provider: provider.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header,
            extra_headers: extra_headers.unwrap_or_default(),
            query_params: Vec::new(),
            local: false,
        })
    }

    /// Failures against this client get local-server diagnostics.
    pub fn local(mut self) -> Self {
        self.local = true;
        self
    }

    pub fn add_query_param(&mut self, key: &str, value: String) {
        self.query_params.push((key.to_string(), value));
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for `path`, without query parameters.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// POST `payload` and decode a JSON body. Any non-2xx status is fatal for
    /// this call and surfaces the status code and the raw body.
    pub async fn post_json<T, R>(&self, path: &str, payload: &T) -> Result<R, AiError>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint(path);
        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json");

        if let Some((name, value)) = &self.auth_header {
            request = request.header(name, value);
        }
        for (key, value) in &self.extra_headers {
            request = request.header(key, value);
        }
        if !self.query_params.is_empty() {
            request = request.query(&self.query_params);
        }

        let response = request.json(payload).send().await.map_err(|e| {
            let err = diagnostics::transport_error(&self.provider, &self.base_url, e, self.local);
            warn!(provider = %self.provider, error = %err, "request failed before a response arrived");
            err
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            diagnostics::transport_error(&self.provider, &self.base_url, e, self.local)
        })?;

        if !status.is_success() {
            warn!(provider = %self.provider, status = status.as_u16(), "non-success status");
            return Err(AiError::Upstream {
                provider: self.provider.clone(),
                status: status.as_u16(),
                body,
            });
        }

        debug!(provider = %self.provider, bytes = body.len(), "response received");
        serde_json::from_str(&body).map_err(|e| AiError::InvalidResponse {
            provider: self.provider.clone(),
            detail: format!("{}: {}", e, truncate(&body, 200)),
        })
    }
}

fn is_loopback(base_url: &str) -> bool {
    reqwest::Url::parse(base_url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .is_some_and(|host| {
            host == "localhost"
                || host
                    .trim_matches(|c| c == '[' || c == ']')
                    .parse::<std::net::IpAddr>()
                    .is_ok_and(|ip| ip.is_loopback())
        })
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max_chars).collect();
        out.push_str("...");
        out
    }
}
