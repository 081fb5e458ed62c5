use super::{
    ChatState,
    handler::{
        ClearCommand, HelpCommand, HistoryCommand, ImageCommand, LocalUrlCommand, ModelCommand,
        ProviderCommand, ProvidersCommand, QuitCommand, RestartCommand,
    },
    registry::CommandRegistry,
};
use std::sync::Arc;
use techne_ai::AiError;

#[derive(Clone)]
pub struct CommandDispatcher {
    registry: Arc<CommandRegistry>,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self { registry }
    }

    pub async fn execute(
        &self,
        command: &str,
        args: &[&str],
        state: &mut ChatState,
    ) -> Result<Option<String>, AiError> {
        self.registry.execute(command, args, state).await
    }

    pub fn get_command_names(&self) -> Vec<String> {
        self.registry.get_command_names()
    }
}

pub fn create_command_registry() -> CommandDispatcher {
    let mut registry = CommandRegistry::new();

    registry.register("quit", QuitCommand);
    registry.register("clear", ClearCommand);
    registry.register("restart", RestartCommand);
    registry.register("history", HistoryCommand);
    registry.register("providers", ProvidersCommand);
    registry.register("provider", ProviderCommand);
    registry.register("model", ModelCommand);
    registry.register("local-url", LocalUrlCommand);
    registry.register("image", ImageCommand);

    let mut lines = registry.help_lines();
    lines.push(HelpCommand::HELP);
    lines.sort_unstable();
    registry.register("help", HelpCommand::new(lines));

    CommandDispatcher::new(Arc::new(registry))
}
