use crate::config::{Config, ProviderKind};
use crate::core::error::AiError;
use crate::providers::factory::{ProviderFactory, ProviderStatus, StartupReport};
use crate::providers::local::normalize_base_url;
use crate::providers::{
    Capabilities, ChatRequest, ImageGeneration, ImageRequest, LLMProvider, Message, Usage,
};
use crate::registry::{ProviderRegistry, is_auto};
use crate::session::ConversationSession;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-call overrides. Unset fields fall back to configuration defaults.
#[derive(Debug, Clone, Default)]
pub struct GenerationOptions {
    /// Provider name, or `auto` / `default`.
    pub provider: Option<String>,
    pub model: Option<String>,
    /// Switching prompts restarts the conversation. `None` keeps the current one.
    pub system_message: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub new_conversation: bool,
    pub verbose: bool,
}

impl GenerationOptions {
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_system_message(mut self, system_message: impl Into<String>) -> Self {
        self.system_message = Some(system_message.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImageOptions {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub size: Option<String>,
    pub count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub provider: String,
    pub model: String,
    pub usage: Option<Usage>,
}

/// Returned instead of an error when nothing is registered, so hosts can degrade quietly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoftFailure {
    pub content: String,
    pub error: String,
}

impl SoftFailure {
    fn no_providers() -> Self {
        let err = AiError::NoProviderConfigured;
        Self {
            content: err.user_message(),
            error: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChatOutcome {
    Reply(ChatReply),
    Unavailable(SoftFailure),
}

impl ChatOutcome {
    pub fn reply(&self) -> Option<&ChatReply> {
        match self {
            ChatOutcome::Reply(reply) => Some(reply),
            ChatOutcome::Unavailable(_) => None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, ChatOutcome::Unavailable(_))
    }

    /// Text to show: the reply, or the unavailability notice.
    pub fn content(&self) -> &str {
        match self {
            ChatOutcome::Reply(reply) => &reply.response,
            ChatOutcome::Unavailable(failure) => &failure.content,
        }
    }
}

/// Snapshot for a host settings screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveConfiguration {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub available_providers: Vec<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub system_prompt: String,
}

/// `None` for unset, empty, `auto` and `default`.
fn explicit(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !is_auto(v))
}

/// Owns the registry and the conversation. Mutating calls take `&mut self`,
/// so one orchestrator handles one request at a time.
pub struct Orchestrator {
    registry: ProviderRegistry,
    session: ConversationSession,
    config: Config,
    factory: ProviderFactory,
    startup: StartupReport,
}

impl Orchestrator {
    /// Builds every configured provider. Construction failures are recorded in
    /// the startup report and never fail the orchestrator itself.
    pub fn new(config: Config) -> Self {
        let factory = ProviderFactory::new();
        let (registry, startup) = factory.build_registry(&config);
        let mut orchestrator = Self::assemble(registry, config, factory, startup);

        info!(
            temperature = orchestrator.config.temperature(),
            max_tokens = orchestrator.config.max_tokens(),
            default = ?orchestrator.default_provider(),
            providers = ?orchestrator.available_providers(),
            "AI orchestrator ready"
        );
        if orchestrator.registry.is_empty() {
            warn!("no AI providers configured");
        }
        orchestrator.apply_configured_default();
        orchestrator
    }

    /// Uses an already populated registry.
    pub fn with_registry(registry: ProviderRegistry, config: Config) -> Self {
        let mut orchestrator =
            Self::assemble(registry, config, ProviderFactory::new(), StartupReport::default());
        orchestrator.apply_configured_default();
        orchestrator
    }

    fn assemble(
        registry: ProviderRegistry,
        config: Config,
        factory: ProviderFactory,
        startup: StartupReport,
    ) -> Self {
        Self {
            session: ConversationSession::new(config.system_prompt()),
            registry,
            config,
            factory,
            startup,
        }
    }

    fn apply_configured_default(&mut self) {
        if let Some(name) = self.config.default_provider.clone() {
            // An unknown name is logged by the registry and leaves `auto` in place.
            self.registry.set_default(&name);
        }
    }

    fn resolve(&self, requested: Option<&str>) -> Result<Option<(String, Arc<dyn LLMProvider>)>, AiError> {
        if self.registry.is_empty() {
            return Ok(None);
        }
        let name = match explicit(requested) {
            Some(name) => name.to_lowercase(),
            None => match self.registry.resolve_default() {
                Some(name) => name,
                None => return Ok(None),
            },
        };
        match self.registry.get(&name) {
            Some(provider) => Ok(Some((name, provider))),
            None => Err(AiError::ProviderUnavailable {
                name,
                available: self.registry.list(),
            }),
        }
    }

    pub async fn send_message(
        &mut self,
        message: &str,
        options: &GenerationOptions,
    ) -> Result<ChatOutcome, AiError> {
        if message.trim().is_empty() {
            return Err(AiError::Input("Message cannot be empty".to_string()));
        }

        let Some((provider_name, provider)) = self.resolve(options.provider.as_deref())? else {
            warn!("message not sent, no AI providers configured");
            return Ok(ChatOutcome::Unavailable(SoftFailure::no_providers()));
        };

        let model = explicit(options.model.as_deref())
            .unwrap_or_else(|| provider.default_model())
            .to_string();
        let temperature = options.temperature.unwrap_or(self.config.temperature());
        let max_tokens = options.max_tokens.unwrap_or(self.config.max_tokens());
        let verbose = options.verbose || self.config.verbose;
        let system_prompt = options
            .system_message
            .clone()
            .unwrap_or_else(|| self.session.system_prompt().to_string());

        info!(provider = %provider_name, model = %model, "sending message");

        // On failure the guard also undoes the restart.
        let turn = if options.new_conversation || system_prompt != self.session.system_prompt() {
            debug!(new_conversation = options.new_conversation, "starting fresh conversation");
            self.session
                .begin_turn_after_restart(system_prompt.clone(), message)
        } else {
            self.session.begin_turn(message)
        };
        let request = ChatRequest {
            message,
            model: &model,
            system_message: &system_prompt,
            temperature,
            max_tokens,
            conversation_history: turn.prior_history(),
            verbose,
        };

        let result = provider.send_message(&request).await;
        match result {
            Ok(reply) => {
                turn.commit(reply.content.clone());
                debug!(
                    provider = %provider_name,
                    model = %reply.model,
                    chars = reply.content.len(),
                    "reply received"
                );
                Ok(ChatOutcome::Reply(ChatReply {
                    response: reply.content,
                    provider: provider_name,
                    model: reply.model,
                    usage: reply.usage,
                }))
            }
            Err(e) => {
                drop(turn);
                warn!(provider = %provider_name, error = %e, "request failed, conversation rolled back");
                Err(e)
            }
        }
    }

    /// Stateless: the conversation is not touched.
    pub async fn generate_image(
        &self,
        prompt: &str,
        options: &ImageOptions,
    ) -> Result<ImageGeneration, AiError> {
        if prompt.trim().is_empty() {
            return Err(AiError::Input("Image prompt cannot be empty".to_string()));
        }
        let (provider_name, provider) = self
            .resolve(options.provider.as_deref())?
            .ok_or(AiError::NoProviderConfigured)?;

        if !provider.capabilities().image_generation {
            return Err(AiError::Capability {
                provider: provider_name,
                operation: "image generation",
            });
        }

        let model = explicit(options.model.as_deref())
            .or_else(|| provider.default_image_model())
            .unwrap_or_else(|| provider.default_model())
            .to_string();
        let request = ImageRequest {
            prompt,
            model: &model,
            size: options.size.as_deref(),
            count: options.count.unwrap_or(1).max(1),
        };

        info!(provider = %provider_name, model = %model, "generating image");
        provider.generate_image(&request).await.inspect_err(|e| {
            warn!(provider = %provider_name, error = %e, "image generation failed");
        })
    }

    pub fn available_providers(&self) -> Vec<String> {
        self.registry.list()
    }

    /// Empty when the provider is not registered.
    pub fn provider_models(&self, provider: &str) -> Vec<String> {
        self.registry
            .get(provider)
            .map(|p| p.available_models())
            .unwrap_or_default()
    }

    pub fn provider_capabilities(&self, provider: &str) -> Option<Capabilities> {
        self.registry.get(provider).map(|p| p.capabilities())
    }

    /// Concrete provider `auto` currently resolves to.
    pub fn default_provider(&self) -> Option<String> {
        self.registry.resolve_default()
    }

    pub fn default_model_for(&self, provider: &str) -> Option<String> {
        self.registry
            .get(provider)
            .map(|p| p.default_model().to_string())
    }

    pub fn set_default_provider(&mut self, name: &str) -> Result<(), AiError> {
        if !self.registry.set_default(name) {
            return Err(AiError::ProviderUnavailable {
                name: name.trim().to_string(),
                available: self.registry.list(),
            });
        }
        self.config.default_provider = explicit(Some(name)).map(str::to_lowercase);
        info!(provider = %self.registry.default(), "default provider changed");
        Ok(())
    }

    /// Rebinds only the local provider. On error the previous binding stays.
    /// Returns the normalized base URL.
    pub fn update_local_provider_url(&mut self, url: &str) -> Result<String, AiError> {
        let base_url = normalize_base_url(url)?;
        let mut local = self.config.provider(ProviderKind::Local);
        local.base_url = Some(base_url.clone());

        let provider = self.factory.create(ProviderKind::Local, &local)?;
        self.registry.register(ProviderKind::Local.name(), provider);
        self.config.set_local_url(&base_url);
        self.startup
            .record(ProviderKind::Local, ProviderStatus::Registered);

        info!(url = %base_url, "local provider URL updated");
        Ok(base_url)
    }

    /// Drops history, keeping the current system prompt.
    pub fn clear_conversation(&mut self) {
        self.session.clear();
        debug!("conversation cleared");
    }

    /// Drops history and switches to `system_message`, or the configured prompt.
    pub fn restart_conversation(&mut self, system_message: Option<&str>) {
        let prompt = system_message
            .map(str::to_string)
            .unwrap_or_else(|| self.config.system_prompt().to_string());
        self.session.restart(prompt);
    }

    pub fn conversation_history(&self) -> Vec<Message> {
        self.session.history()
    }

    pub fn system_prompt(&self) -> &str {
        self.session.system_prompt()
    }

    pub fn current_configuration(&self) -> ActiveConfiguration {
        let provider = self.default_provider();
        let model = provider
            .as_deref()
            .and_then(|name| self.default_model_for(name));
        ActiveConfiguration {
            provider,
            model,
            available_providers: self.available_providers(),
            temperature: self.config.temperature(),
            max_tokens: self.config.max_tokens(),
            system_prompt: self.session.system_prompt().to_string(),
        }
    }

    pub fn startup_report(&self) -> &StartupReport {
        &self.startup
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_treats_auto_and_blank_as_unset() {
        assert_eq!(explicit(None), None);
        assert_eq!(explicit(Some("")), None);
        assert_eq!(explicit(Some("auto")), None);
        assert_eq!(explicit(Some("DEFAULT")), None);
        assert_eq!(explicit(Some(" gpt-4o ")), Some("gpt-4o"));
    }

    #[tokio::test]
    async fn test_soft_failure_when_nothing_registered() {
        let mut orchestrator =
            Orchestrator::with_registry(ProviderRegistry::new("local"), Config::default());
        let outcome = orchestrator
            .send_message("hello", &GenerationOptions::default().with_provider("openai"))
            .await
            .unwrap();

        let ChatOutcome::Unavailable(failure) = outcome else {
            panic!("expected soft failure");
        };
        assert_eq!(failure.error, "No AI providers configured");
        assert!(orchestrator.conversation_history().is_empty());
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected_before_touching_history() {
        let mut orchestrator =
            Orchestrator::with_registry(ProviderRegistry::new("local"), Config::default());
        let err = orchestrator
            .send_message("   ", &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::Input(_)));
    }

    #[test]
    fn test_update_local_url_registers_and_rejects_garbage() {
        let mut orchestrator =
            Orchestrator::with_registry(ProviderRegistry::new("local"), Config::default());

        let url = orchestrator
            .update_local_provider_url("http://127.0.0.1:9999/")
            .unwrap();
        assert_eq!(url, "http://127.0.0.1:9999/v1");
        assert_eq!(orchestrator.available_providers(), vec!["local"]);
        assert_eq!(
            orchestrator.startup_report().status(ProviderKind::Local),
            Some(&ProviderStatus::Registered)
        );

        let err = orchestrator
            .update_local_provider_url("nonsense")
            .unwrap_err();
        assert!(matches!(err, AiError::Config(_)));
        assert_eq!(
            orchestrator
                .config()
                .provider(ProviderKind::Local)
                .base_url
                .as_deref(),
            Some("http://127.0.0.1:9999/v1")
        );
    }

    #[test]
    fn test_restart_without_prompt_uses_configured_one() {
        let config = Config {
            system_prompt: Some("configured".to_string()),
            ..Default::default()
        };
        let mut orchestrator =
            Orchestrator::with_registry(ProviderRegistry::new("local"), config);
        orchestrator.restart_conversation(Some("custom"));
        assert_eq!(orchestrator.system_prompt(), "custom");
        orchestrator.restart_conversation(None);
        assert_eq!(orchestrator.system_prompt(), "configured");
    }
}
