pub mod dispatcher;
pub mod handler;
pub mod registry;

use crate::display::DisplayMode;
use crate::providers::factory::ProviderFactory;
use crate::session::Session;
use crate::tools::ToolSchema;
use std::path::PathBuf;
use std::sync::Arc;

pub use dispatcher::create_command_registry;

/// Everything a slash command may look at or change between turns.
pub struct ChatState {
    pub session: Session,
    pub factory: Arc<ProviderFactory>,
    pub tools: Vec<ToolSchema>,
    pub display_mode: DisplayMode,
    pub history_dir: PathBuf,
    /// Message queued by a command to be sent as the next user turn
    pub pending_input: Option<String>,
    pub should_continue: bool,
}

impl ChatState {
    pub fn new(
        session: Session,
        factory: Arc<ProviderFactory>,
        tools: Vec<ToolSchema>,
        history_dir: PathBuf,
    ) -> Self {
        Self {
            session,
            factory,
            tools,
            display_mode: DisplayMode::default(),
            history_dir,
            pending_input: None,
            should_continue: true,
        }
    }
}
