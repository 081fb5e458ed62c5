use super::ChatState;
use crate::app::generate_and_save;
use async_trait::async_trait;
use console::style;
use techne_ai::config::DEFAULT_LOCAL_URL;
use techne_ai::{AiError, ProviderKind, Role};

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(&self, state: &mut ChatState, args: &[&str])
    -> Result<Option<String>, AiError>;
    fn help(&self) -> &'static str;
}

pub struct HelpCommand {
    lines: Vec<&'static str>,
}
pub struct QuitCommand;
pub struct ClearCommand;
pub struct RestartCommand;
pub struct HistoryCommand;
pub struct ProvidersCommand;
pub struct ProviderCommand;
pub struct ModelCommand;
pub struct LocalUrlCommand;
pub struct ImageCommand;

impl HelpCommand {
    pub const HELP: &'static str = "/help - Show available commands";

    pub fn new(lines: Vec<&'static str>) -> Self {
        Self { lines }
    }
}

#[async_trait]
impl CommandHandler for HelpCommand {
    async fn execute(
        &self,
        _state: &mut ChatState,
        _args: &[&str],
    ) -> Result<Option<String>, AiError> {
        let title = style("Available Commands").bold().underlined().to_string();
        let mut text = vec![title];
        text.extend(self.lines.iter().map(|line| line.to_string()));
        Ok(Some(text.join("\n")))
    }

    fn help(&self) -> &'static str {
        Self::HELP
    }
}

#[async_trait]
impl CommandHandler for QuitCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        _args: &[&str],
    ) -> Result<Option<String>, AiError> {
        state.should_continue = false;
        Ok(None)
    }

    fn help(&self) -> &'static str {
        "/quit - Exit the chat session"
    }
}

#[async_trait]
impl CommandHandler for ClearCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        _args: &[&str],
    ) -> Result<Option<String>, AiError> {
        state.orchestrator.clear_conversation();
        Ok(Some("Conversation cleared.".to_string()))
    }

    fn help(&self) -> &'static str {
        "/clear - Forget the conversation, keep the system prompt"
    }
}

#[async_trait]
impl CommandHandler for RestartCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        args: &[&str],
    ) -> Result<Option<String>, AiError> {
        let prompt = args.join(" ");
        let prompt = Some(prompt.as_str()).filter(|p| !p.is_empty());
        state.orchestrator.restart_conversation(prompt);
        state.options.system_message = None;
        Ok(Some(format!(
            "New conversation. System prompt: {}",
            style(state.orchestrator.system_prompt()).italic()
        )))
    }

    fn help(&self) -> &'static str {
        "/restart [prompt] - Start over, optionally with a new system prompt"
    }
}

#[async_trait]
impl CommandHandler for HistoryCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        _args: &[&str],
    ) -> Result<Option<String>, AiError> {
        let history = state.orchestrator.conversation_history();
        if history.is_empty() {
            return Ok(Some("No messages yet.".to_string()));
        }
        let lines: Vec<String> = history
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::User => style("you").bold().cyan(),
                    Role::Assistant => style("ai").bold().blue(),
                    Role::System => style("system").bold().dim(),
                };
                format!(
                    "{} {} {}",
                    style(m.timestamp.format("%H:%M:%S")).dim(),
                    role,
                    m.content
                )
            })
            .collect();
        Ok(Some(lines.join("\n")))
    }

    fn help(&self) -> &'static str {
        "/history - Show the conversation so far"
    }
}

#[async_trait]
impl CommandHandler for ProvidersCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        _args: &[&str],
    ) -> Result<Option<String>, AiError> {
        let orchestrator = &state.orchestrator;
        let providers = orchestrator.available_providers();
        if providers.is_empty() {
            return Ok(Some(AiError::NoProviderConfigured.user_message()));
        }
        let default = orchestrator.default_provider();
        let lines: Vec<String> = providers
            .iter()
            .map(|name| {
                let marker = if default.as_deref() == Some(name.as_str()) {
                    style("*").bold().green().to_string()
                } else {
                    " ".to_string()
                };
                let model = orchestrator.default_model_for(name).unwrap_or_default();
                let images = orchestrator
                    .provider_capabilities(name)
                    .filter(|c| c.image_generation)
                    .map(|_| " [images]")
                    .unwrap_or_default();
                format!("{} {} ({}){}", marker, style(name).bold(), model, images)
            })
            .collect();
        Ok(Some(lines.join("\n")))
    }

    fn help(&self) -> &'static str {
        "/providers - List configured providers"
    }
}

#[async_trait]
impl CommandHandler for ProviderCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        args: &[&str],
    ) -> Result<Option<String>, AiError> {
        let Some(name) = args.first() else {
            let current = state
                .orchestrator
                .default_provider()
                .unwrap_or_else(|| "none".to_string());
            return Ok(Some(format!("Current provider: {}", current)));
        };

        state.orchestrator.set_default_provider(name)?;
        state.options.provider = None;
        state.options.model = None;
        let resolved = state
            .orchestrator
            .default_provider()
            .unwrap_or_else(|| "none".to_string());
        Ok(Some(format!("Provider set to: {} ({})", name, resolved)))
    }

    fn help(&self) -> &'static str {
        "/provider <name|auto> - Show or change the provider"
    }
}

#[async_trait]
impl CommandHandler for ModelCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        args: &[&str],
    ) -> Result<Option<String>, AiError> {
        let provider = state
            .options
            .provider
            .clone()
            .or_else(|| state.orchestrator.default_provider());

        let Some(model) = args.first() else {
            let current = state
                .options
                .model
                .clone()
                .or_else(|| provider.as_deref().and_then(|p| state.orchestrator.default_model_for(p)))
                .unwrap_or_else(|| "none".to_string());
            return Ok(Some(format!("Current model: {}", current)));
        };

        if techne_ai::registry::is_auto(model) {
            state.options.model = None;
            return Ok(Some("Model reset to the provider default.".to_string()));
        }

        state.options.model = Some(model.to_string());
        let known = provider
            .as_deref()
            .map(|p| state.orchestrator.provider_models(p))
            .unwrap_or_default();
        if !known.is_empty() && !known.iter().any(|m| m == model) {
            return Ok(Some(format!(
                "Model changed to: {} (not in the {} catalog)",
                model,
                provider.unwrap_or_default()
            )));
        }
        Ok(Some(format!("Model changed to: {}", model)))
    }

    fn help(&self) -> &'static str {
        "/model <name|auto> - Show or change the model"
    }
}

#[async_trait]
impl CommandHandler for LocalUrlCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        args: &[&str],
    ) -> Result<Option<String>, AiError> {
        let Some(url) = args.first() else {
            let current = state
                .orchestrator
                .config()
                .provider(ProviderKind::Local)
                .base_url
                .unwrap_or_else(|| format!("{} (not enabled)", DEFAULT_LOCAL_URL));
            return Ok(Some(format!("Local AI URL: {}", current)));
        };
        let base_url = state.orchestrator.update_local_provider_url(url)?;
        Ok(Some(format!("Local provider now at {}", base_url)))
    }

    fn help(&self) -> &'static str {
        "/local-url <url> - Point the local provider at another server"
    }
}

#[async_trait]
impl CommandHandler for ImageCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        args: &[&str],
    ) -> Result<Option<String>, AiError> {
        if args.is_empty() {
            return Ok(Some("Usage: /image <prompt>".to_string()));
        }
        let prompt = args.join(" ");
        generate_and_save(state, &prompt).await?;
        Ok(None)
    }

    fn help(&self) -> &'static str {
        "/image <prompt> - Generate an image with the current provider"
    }
}
