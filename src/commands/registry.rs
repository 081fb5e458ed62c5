use super::ChatState;
use crate::commands::handler::CommandHandler;
use std::collections::BTreeMap;
use std::sync::Arc;
use techne_ai::AiError;

pub struct CommandRegistry {
    handlers: BTreeMap<String, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    pub fn register<C: CommandHandler + 'static>(&mut self, name: &str, command: C) {
        self.handlers.insert(name.to_string(), Arc::new(command));
    }

    pub async fn execute(
        &self,
        name: &str,
        args: &[&str],
        state: &mut ChatState,
    ) -> Result<Option<String>, AiError> {
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| AiError::Input(format!("Unknown command: /{}. Try /help", name)))?;
        handler.execute(state, args).await
    }

    /// Sorted by name.
    pub fn get_command_names(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    pub fn help_lines(&self) -> Vec<&'static str> {
        self.handlers.values().map(|h| h.help()).collect()
    }
}
