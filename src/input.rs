use crate::commands::dispatcher::CommandDispatcher;
use crate::config::Profile;
use crate::core::error::TchatError;

use console::style;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::{Hinter, HistoryHinter};
use rustyline::history::FileHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, Context, EditMode, Editor, Helper};
use std::borrow::Cow;
use std::path::PathBuf;

pub type ChatEditor = Editor<ChatHelper, FileHistory>;

/// Completes slash commands, profile names after `/profile ` and language
/// agents after `/language `.
pub struct ChatHelper {
    commands: CommandDispatcher,
    hinter: HistoryHinter,
}

impl ChatHelper {
    pub fn new(commands: CommandDispatcher) -> Self {
        Self {
            commands,
            hinter: HistoryHinter {},
        }
    }

    fn candidates(&self, line: &str) -> (usize, Vec<String>) {
        if let Some(partial) = line.strip_prefix("/profile ") {
            let start = line.len() - partial.len();
            let names = Profile::ALL
                .iter()
                .map(|p| p.name())
                .filter(|name| name.to_lowercase().starts_with(&partial.to_lowercase()))
                .map(str::to_string)
                .collect();
            return (start, names);
        }

        if let Some(partial) = line.strip_prefix("/language ") {
            let start = line.len() - partial.len();
            let names = ["auto", "english", "urdu"]
                .into_iter()
                .filter(|name| name.starts_with(&partial.to_lowercase()))
                .map(str::to_string)
                .collect();
            return (start, names);
        }

        match line.strip_prefix('/') {
            Some(partial) if !partial.contains(' ') => {
                let names = self
                    .commands
                    .get_command_names()
                    .into_iter()
                    .filter(|cmd| cmd.starts_with(partial))
                    .collect();
                (1, names)
            }
            _ => (0, Vec::new()),
        }
    }
}

impl Helper for ChatHelper {}

impl Completer for ChatHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, names) = self.candidates(&line[..pos]);
        let pairs = names
            .into_iter()
            .map(|name| Pair {
                display: name.clone(),
                replacement: name,
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for ChatHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, ctx: &Context<'_>) -> Option<String> {
        self.hinter.hint(line, pos, ctx)
    }
}

impl Highlighter for ChatHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(style(hint).dim().to_string())
    }
}

impl Validator for ChatHelper {}

fn history_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".toolchat")
        .join("input_history.txt")
}

pub fn create_editor(commands: CommandDispatcher) -> Result<ChatEditor, TchatError> {
    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .edit_mode(EditMode::Emacs)
        .build();

    let mut editor = Editor::with_config(config)
        .map_err(|e| TchatError::Input(format!("Failed to create line editor: {}", e)))?;
    editor.set_helper(Some(ChatHelper::new(commands)));
    let _ = editor.load_history(&history_path());

    Ok(editor)
}

/// One line from the user. `None` on Ctrl-C or Ctrl-D.
pub fn read_input(editor: &mut ChatEditor) -> Result<Option<String>, TchatError> {
    let prompt = style("> ").bold().cyan().to_string();
    match editor.readline(&prompt) {
        Ok(line) => Ok(Some(line)),
        Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
        Err(err) => Err(TchatError::Input(format!("Input error: {}", err))),
    }
}

pub fn save_history(editor: &mut ChatEditor) -> Result<(), TchatError> {
    let path = history_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    editor
        .save_history(&path)
        .map_err(|e| TchatError::Input(format!("Failed to save input history: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::create_command_registry;

    #[test]
    fn completes_commands_and_profiles() {
        let helper = ChatHelper::new(create_command_registry());

        let (start, names) = helper.candidates("/pro");
        assert_eq!(start, 1);
        assert_eq!(names, vec!["profile", "profiles"]);

        let (start, names) = helper.candidates("/profile deep");
        assert_eq!(start, "/profile ".len());
        assert_eq!(names, vec!["DeepSeek-Chat-V3"]);

        let (_, names) = helper.candidates("/language U");
        assert_eq!(names, vec!["urdu"]);

        assert!(helper.candidates("hello").1.is_empty());
    }
}
