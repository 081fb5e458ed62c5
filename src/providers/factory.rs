use crate::config::{Config, ProviderConfig, ProviderKind};
use crate::core::error::AiError;
use crate::providers::{
    LLMProvider, anthropic::AnthropicProvider, gemini::GeminiProvider, groq::GroqProvider,
    local::LocalProvider, openai::OpenAIProvider, openrouter::OpenRouterProvider,
};
use crate::registry::ProviderRegistry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

type ProviderCreator =
    Box<dyn Fn(&ProviderConfig) -> Result<Arc<dyn LLMProvider>, AiError> + Send + Sync>;

/// Outcome of trying to construct one provider at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderStatus {
    Registered,
    /// No credential present; not attempted.
    NotConfigured,
    Failed(String),
}

impl fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderStatus::Registered => write!(f, "registered"),
            ProviderStatus::NotConfigured => write!(f, "not configured"),
            ProviderStatus::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StartupReport {
    entries: Vec<(ProviderKind, ProviderStatus)>,
}

impl StartupReport {
    /// Later records for the same kind replace earlier ones.
    pub fn record(&mut self, kind: ProviderKind, status: ProviderStatus) {
        match self.entries.iter_mut().find(|(k, _)| *k == kind) {
            Some(entry) => entry.1 = status,
            None => self.entries.push((kind, status)),
        }
    }

    pub fn entries(&self) -> &[(ProviderKind, ProviderStatus)] {
        &self.entries
    }

    pub fn status(&self, kind: ProviderKind) -> Option<&ProviderStatus> {
        self.entries
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, status)| status)
    }

    pub fn registered(&self) -> Vec<ProviderKind> {
        self.entries
            .iter()
            .filter(|(_, s)| *s == ProviderStatus::Registered)
            .map(|(k, _)| *k)
            .collect()
    }

    pub fn failures(&self) -> Vec<(ProviderKind, &str)> {
        self.entries
            .iter()
            .filter_map(|(k, s)| match s {
                ProviderStatus::Failed(reason) => Some((*k, reason.as_str())),
                _ => None,
            })
            .collect()
    }
}

fn timeout_of(config: &ProviderConfig) -> Option<Duration> {
    config.timeout_secs.map(Duration::from_secs)
}

fn endpoint_of(kind: ProviderKind, config: &ProviderConfig) -> String {
    config
        .base_url
        .clone()
        .unwrap_or_else(|| kind.default_base_url().to_string())
}

/// A blank key is a configuration error, an absent one is handled by the caller.
fn require_key(kind: ProviderKind, config: &ProviderConfig) -> Result<String, AiError> {
    match config.api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => {
            if key.chars().any(char::is_whitespace) {
                Err(AiError::Config(format!(
                    "{} API key contains whitespace",
                    kind.name()
                )))
            } else {
                Ok(key.to_string())
            }
        }
        _ => Err(AiError::Config(format!("{} API key is empty", kind.name()))),
    }
}

pub struct ProviderFactory {
    creators: HashMap<ProviderKind, ProviderCreator>,
}

impl Default for ProviderFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderFactory {
    pub fn new() -> Self {
        let mut creators = HashMap::new();

        creators.insert(
            ProviderKind::OpenAI,
            Box::new(|config: &ProviderConfig| {
                let kind = ProviderKind::OpenAI;
                let provider = OpenAIProvider::with_endpoint(
                    endpoint_of(kind, config),
                    require_key(kind, config)?,
                    config.model.clone(),
                    timeout_of(config),
                )?;
                Ok(Arc::new(provider) as Arc<dyn LLMProvider>)
            }) as ProviderCreator,
        );

        creators.insert(
            ProviderKind::Anthropic,
            Box::new(|config: &ProviderConfig| {
                let kind = ProviderKind::Anthropic;
                let provider = AnthropicProvider::with_endpoint(
                    endpoint_of(kind, config),
                    require_key(kind, config)?,
                    config.model.clone(),
                    timeout_of(config),
                )?;
                Ok(Arc::new(provider) as Arc<dyn LLMProvider>)
            }) as ProviderCreator,
        );

        creators.insert(
            ProviderKind::Groq,
            Box::new(|config: &ProviderConfig| {
                let kind = ProviderKind::Groq;
                let provider = GroqProvider::with_endpoint(
                    endpoint_of(kind, config),
                    require_key(kind, config)?,
                    config.model.clone(),
                    timeout_of(config),
                )?;
                Ok(Arc::new(provider) as Arc<dyn LLMProvider>)
            }) as ProviderCreator,
        );

        creators.insert(
            ProviderKind::OpenRouter,
            Box::new(|config: &ProviderConfig| {
                let kind = ProviderKind::OpenRouter;
                let provider = OpenRouterProvider::with_endpoint(
                    endpoint_of(kind, config),
                    require_key(kind, config)?,
                    config.model.clone(),
                    timeout_of(config),
                )?;
                Ok(Arc::new(provider) as Arc<dyn LLMProvider>)
            }) as ProviderCreator,
        );

        creators.insert(
            ProviderKind::Gemini,
            Box::new(|config: &ProviderConfig| {
                let kind = ProviderKind::Gemini;
                let provider = GeminiProvider::with_endpoint(
                    endpoint_of(kind, config),
                    require_key(kind, config)?,
                    config.model.clone(),
                    timeout_of(config),
                )?;
                Ok(Arc::new(provider) as Arc<dyn LLMProvider>)
            }) as ProviderCreator,
        );

        creators.insert(
            ProviderKind::Local,
            Box::new(|config: &ProviderConfig| {
                let url = config.base_url.as_deref().unwrap_or_default();
                let provider = LocalProvider::new(url, config.model.clone(), timeout_of(config))?;
                Ok(Arc::new(provider) as Arc<dyn LLMProvider>)
            }) as ProviderCreator,
        );

        Self { creators }
    }

    pub fn create(
        &self,
        kind: ProviderKind,
        config: &ProviderConfig,
    ) -> Result<Arc<dyn LLMProvider>, AiError> {
        self.creators
            .get(&kind)
            .ok_or_else(|| AiError::Config(format!("Provider not found: {:?}", kind)))
            .and_then(|creator| creator(config))
    }

    /// Whether `config` carries enough for `kind` to be attempted at all.
    pub fn is_configured(kind: ProviderKind, config: &ProviderConfig) -> bool {
        if kind.requires_api_key() {
            config.api_key.is_some()
        } else {
            config.base_url.is_some()
        }
    }

    /// Construct every configured provider in registration order. Failures are
    /// logged and recorded; they never abort startup.
    pub fn build_registry(&self, config: &Config) -> (ProviderRegistry, StartupReport) {
        let mut registry = ProviderRegistry::new(config.auto_preference());
        let mut report = StartupReport::default();

        for kind in ProviderKind::ALL {
            let provider_config = config.provider(kind);
            if !Self::is_configured(kind, &provider_config) {
                report.record(kind, ProviderStatus::NotConfigured);
                continue;
            }
            match self.create(kind, &provider_config) {
                Ok(provider) => {
                    info!(provider = kind.name(), model = provider.default_model(), "provider initialized");
                    registry.register(kind.name(), provider);
                    report.record(kind, ProviderStatus::Registered);
                }
                Err(e) => {
                    warn!(provider = kind.name(), error = %e, "provider construction failed, skipping");
                    report.record(kind, ProviderStatus::Failed(e.to_string()));
                }
            }
        }

        (registry, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed(key: &str) -> ProviderConfig {
        ProviderConfig {
            api_key: Some(key.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_only_configured_providers_are_attempted() {
        let mut config = Config::default();
        config.providers.insert(ProviderKind::Anthropic, keyed("sk-ant"));
        config.providers.insert(ProviderKind::Groq, keyed("   "));

        let (registry, report) = ProviderFactory::new().build_registry(&config);

        assert_eq!(registry.list(), vec!["anthropic".to_string()]);
        assert_eq!(
            report.status(ProviderKind::OpenAI),
            Some(&ProviderStatus::NotConfigured)
        );
        assert_eq!(
            report.status(ProviderKind::Anthropic),
            Some(&ProviderStatus::Registered)
        );
        let failures = report.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, ProviderKind::Groq);
        assert!(failures[0].1.contains("empty"));
        assert!(!registry.has("groq"));
    }

    #[test]
    fn test_invalid_local_url_is_reported_not_registered() {
        let mut config = Config::default();
        config.set_local_url("definitely not a url");

        let (registry, report) = ProviderFactory::new().build_registry(&config);

        assert!(registry.is_empty());
        assert!(matches!(
            report.status(ProviderKind::Local),
            Some(ProviderStatus::Failed(_))
        ));
    }

    #[test]
    fn test_registration_order_is_fixed() {
        let mut config = Config::default();
        config.set_local_url("http://localhost:1234");
        config.providers.insert(ProviderKind::Gemini, keyed("g"));
        config.providers.insert(ProviderKind::OpenAI, keyed("o"));

        let (registry, report) = ProviderFactory::new().build_registry(&config);

        assert_eq!(registry.list(), vec!["openai", "gemini", "local"]);
        assert_eq!(
            report.registered(),
            vec![ProviderKind::OpenAI, ProviderKind::Gemini, ProviderKind::Local]
        );
    }

    #[test]
    fn test_model_override_reaches_provider() {
        let config = ProviderConfig {
            api_key: Some("k".to_string()),
            model: Some("gemma2-9b-it".to_string()),
            ..Default::default()
        };
        let provider = ProviderFactory::new()
            .create(ProviderKind::Groq, &config)
            .unwrap();
        assert_eq!(provider.default_model(), "gemma2-9b-it");
    }
}
