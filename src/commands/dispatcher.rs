use super::{
    ChatState,
    handler::{
        DisplayCommand, HelpCommand, HistoryCommand, LanguageCommand, ProfileCommand,
        ProfilesCommand, QuitCommand, StartersCommand, ToolsCommand,
    },
    registry::CommandRegistry,
};
use crate::core::error::TchatError;
use std::sync::Arc;

#[derive(Clone)]
pub struct CommandDispatcher {
    registry: Arc<CommandRegistry>,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self { registry }
    }

    pub fn execute(
        &self,
        command: &str,
        args: &[&str],
        state: &mut ChatState,
    ) -> Result<Option<String>, TchatError> {
        self.registry.execute(command, args, state)
    }

    /// Run `line` if it is a slash command. `None` means it is a chat message.
    pub fn execute_line(
        &self,
        line: &str,
        state: &mut ChatState,
    ) -> Option<Result<Option<String>, TchatError>> {
        let (command, args) = parse_command(line)?;
        Some(self.execute(command, &args, state))
    }

    pub fn get_command_names(&self) -> Vec<String> {
        self.registry.get_command_names()
    }
}

/// Split `/name arg1 arg2` into its parts.
pub fn parse_command(line: &str) -> Option<(&str, Vec<&str>)> {
    let rest = line.trim().strip_prefix('/')?;
    let mut parts = rest.split_whitespace();
    let command = parts.next()?;
    Some((command, parts.collect()))
}

pub fn create_command_registry() -> CommandDispatcher {
    let mut registry = CommandRegistry::new();

    registry.register(QuitCommand);
    registry.register(ProfileCommand);
    registry.register(ProfilesCommand);
    registry.register(ToolsCommand);
    registry.register(StartersCommand);
    registry.register(HistoryCommand);
    registry.register(DisplayCommand);
    registry.register(LanguageCommand);

    let mut help_lines = registry.help_lines();
    help_lines.push(HelpCommand::USAGE);
    help_lines.sort_unstable();
    registry.register(HelpCommand::new(help_lines));

    CommandDispatcher::new(Arc::new(registry))
}
