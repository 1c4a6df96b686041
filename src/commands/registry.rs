use super::ChatState;
use crate::commands::handler::CommandHandler;
use crate::core::error::TchatError;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Default)]
pub struct CommandRegistry {
    handlers: BTreeMap<String, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<C: CommandHandler + 'static>(&mut self, command: C) {
        self.handlers
            .insert(command.name().to_string(), Arc::new(command));
    }

    pub fn execute(
        &self,
        name: &str,
        args: &[&str],
        state: &mut ChatState,
    ) -> Result<Option<String>, TchatError> {
        self.handlers
            .get(name)
            .ok_or_else(|| {
                TchatError::Input(format!("Unknown command: /{} (try /help)", name))
            })
            .and_then(|handler| handler.execute(state, args))
    }

    pub fn get_command_names(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    /// One usage line per command, in name order.
    pub fn help_lines(&self) -> Vec<&'static str> {
        self.handlers.values().map(|h| h.help()).collect()
    }
}
