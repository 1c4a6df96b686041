use super::ChatState;
use crate::config::Profile;
use crate::core::error::TchatError;
use crate::dispatch::handoff::LanguageAgent;
use crate::display::DisplayMode;
use crate::providers::Role;
use crate::session::Transcript;
use console::style;
use std::fmt::Write;

/// Canned prompts offered to new users: `(label, message)`.
pub const STARTERS: [(&str, &str); 10] = [
    ("Check Weather", "Fetch the current weather for a specified location."),
    (
        "Latest News",
        "Stay updated: fetch the latest news on any topic of your choice.",
    ),
    ("Tell me a joke", "Can you tell me a funny joke?"),
    (
        "Currency Exchange",
        "Fetch the current exchange rate for any currency.",
    ),
    ("IP Geolocation", "Where is this IP located?"),
    (
        "EasyWriter",
        "Can you help me write an easy and clear article about any topic?",
    ),
    (
        "ProfessionalEmailComposer",
        "Can you help me write an email for any topic?",
    ),
    ("LanguageTranslator", "Translate any language into the desired one."),
    ("PromptEngineer", "Help me write a better prompt."),
    (
        "CodeDebugger",
        "Debug the code and explain any issues or improvements.",
    ),
];

pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn execute(&self, state: &mut ChatState, args: &[&str]) -> Result<Option<String>, TchatError>;
    fn help(&self) -> &'static str;
}

pub struct QuitCommand;
pub struct ProfileCommand;
pub struct ProfilesCommand;
pub struct ToolsCommand;
pub struct StartersCommand;
pub struct HistoryCommand;
pub struct DisplayCommand;
pub struct LanguageCommand;

pub struct HelpCommand {
    lines: Vec<&'static str>,
}

impl HelpCommand {
    pub const USAGE: &'static str = "/help - Show available commands";

    pub fn new(lines: Vec<&'static str>) -> Self {
        Self { lines }
    }
}

impl CommandHandler for QuitCommand {
    fn name(&self) -> &'static str {
        "quit"
    }

    fn execute(&self, state: &mut ChatState, _args: &[&str]) -> Result<Option<String>, TchatError> {
        state.should_continue = false;
        Ok(None)
    }

    fn help(&self) -> &'static str {
        "/quit - End the session and save the transcript"
    }
}

impl CommandHandler for HelpCommand {
    fn name(&self) -> &'static str {
        "help"
    }

    fn execute(
        &self,
        _state: &mut ChatState,
        _args: &[&str],
    ) -> Result<Option<String>, TchatError> {
        let mut text = style("Available Commands").bold().underlined().to_string();
        for line in &self.lines {
            let _ = write!(text, "\n{}", line);
        }
        Ok(Some(text))
    }

    fn help(&self) -> &'static str {
        Self::USAGE
    }
}

impl CommandHandler for ProfileCommand {
    fn name(&self) -> &'static str {
        "profile"
    }

    fn execute(&self, state: &mut ChatState, args: &[&str]) -> Result<Option<String>, TchatError> {
        let provider = state.session.provider();
        let Some(name) = args.first() else {
            return Ok(Some(format!(
                "Current profile: {} ({}, {} tool calls)",
                style(state.session.profile()).bold(),
                provider.model(),
                format!("{:?}", state.session.tool_mode()).to_lowercase()
            )));
        };

        let profile: Profile = name.parse()?;
        let bound = state.factory.create(profile)?;
        let model = bound.provider.model().to_string();
        state.session.rebind(bound);
        Ok(Some(format!("Switched to {} ({})", profile, model)))
    }

    fn help(&self) -> &'static str {
        "/profile [name] - Show or switch the chat profile"
    }
}

impl CommandHandler for ProfilesCommand {
    fn name(&self) -> &'static str {
        "profiles"
    }

    fn execute(&self, state: &mut ChatState, _args: &[&str]) -> Result<Option<String>, TchatError> {
        let current = state.session.profile();
        let secrets = state.factory.secrets();
        let lines: Vec<String> = Profile::ALL
            .iter()
            .map(|profile| {
                let marker = if *profile == current { "*" } else { " " };
                let status = if secrets.get(profile.provider().key_env()).is_some() {
                    style("ready").green()
                } else {
                    style("missing key").red()
                };
                format!(
                    "{} {:<18} {} [{}]",
                    marker,
                    profile.name(),
                    profile.description(),
                    status
                )
            })
            .collect();
        Ok(Some(lines.join("\n")))
    }

    fn help(&self) -> &'static str {
        "/profiles - List profiles and whether their keys are set"
    }
}

impl CommandHandler for ToolsCommand {
    fn name(&self) -> &'static str {
        "tools"
    }

    fn execute(&self, state: &mut ChatState, _args: &[&str]) -> Result<Option<String>, TchatError> {
        if state.tools.is_empty() {
            return Ok(Some("No tools are available.".to_string()));
        }
        let lines: Vec<String> = state
            .tools
            .iter()
            .map(|t| format!("{} - {}", style(&t.name).bold().yellow(), t.description))
            .collect();
        Ok(Some(lines.join("\n")))
    }

    fn help(&self) -> &'static str {
        "/tools - List the tools the model can call"
    }
}

impl CommandHandler for StartersCommand {
    fn name(&self) -> &'static str {
        "starters"
    }

    fn execute(&self, state: &mut ChatState, args: &[&str]) -> Result<Option<String>, TchatError> {
        let Some(choice) = args.first() else {
            let lines: Vec<String> = STARTERS
                .iter()
                .enumerate()
                .map(|(i, (label, message))| {
                    format!("{:>2}. {} - {}", i + 1, style(label).bold(), message)
                })
                .collect();
            return Ok(Some(lines.join("\n")));
        };

        let (_, message) = choice
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| STARTERS.get(i))
            .ok_or_else(|| {
                TchatError::Input(format!(
                    "Pick a starter between 1 and {}",
                    STARTERS.len()
                ))
            })?;
        state.pending_input = Some(message.to_string());
        Ok(None)
    }

    fn help(&self) -> &'static str {
        "/starters [n] - List starter prompts, or send starter n"
    }
}

impl CommandHandler for HistoryCommand {
    fn name(&self) -> &'static str {
        "history"
    }

    fn execute(&self, state: &mut ChatState, args: &[&str]) -> Result<Option<String>, TchatError> {
        let files = Transcript::list(&state.history_dir)?;

        let Some(wanted) = args.first() else {
            if files.is_empty() {
                return Ok(Some(format!(
                    "No transcripts in {}",
                    state.history_dir.display()
                )));
            }
            let names: Vec<String> = files
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect();
            return Ok(Some(names.join("\n")));
        };

        let path = files
            .iter()
            .find(|p| {
                p.file_name().is_some_and(|n| n == *wanted)
                    || p.file_stem().is_some_and(|n| n == *wanted)
            })
            .ok_or_else(|| TchatError::Input(format!("No transcript named {}", wanted)))?;

        let transcript = Transcript::load(path)?;
        let lines: Vec<String> = transcript
            .messages()
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::User => style("User").bold().cyan(),
                    Role::Assistant => style("Assistant").bold().magenta(),
                    Role::Tool => style("Tool").bold().yellow(),
                    Role::System => style("System").bold().dim(),
                };
                format!("{}: {}", role, m.content)
            })
            .collect();
        Ok(Some(lines.join("\n")))
    }

    fn help(&self) -> &'static str {
        "/history [file] - List saved transcripts, or print one"
    }
}

impl CommandHandler for DisplayCommand {
    fn name(&self) -> &'static str {
        "display"
    }

    fn execute(&self, state: &mut ChatState, args: &[&str]) -> Result<Option<String>, TchatError> {
        let Some(mode) = args.first() else {
            return Ok(Some(format!(
                "Display mode: {} (verbose, minimal or hidden)",
                state.display_mode
            )));
        };
        state.display_mode = mode.parse::<DisplayMode>().map_err(TchatError::Input)?;
        Ok(Some(format!("Display mode set to {}", state.display_mode)))
    }

    fn help(&self) -> &'static str {
        "/display <mode> - Tool activity shown while answering (verbose/minimal/hidden)"
    }
}

impl CommandHandler for LanguageCommand {
    fn name(&self) -> &'static str {
        "language"
    }

    fn execute(&self, state: &mut ChatState, args: &[&str]) -> Result<Option<String>, TchatError> {
        let Some(choice) = args.first() else {
            let current = state
                .session
                .agent()
                .map_or("the main assistant (any language)", |a| a.name());
            return Ok(Some(format!("Answering: {}", current)));
        };

        let agent = match choice.to_ascii_lowercase().as_str() {
            "auto" | "off" => None,
            other => Some(other.parse::<LanguageAgent>()?),
        };
        state.session.hand_off(agent);
        Ok(Some(match agent {
            Some(agent) => format!("Handed off to {}", agent),
            None => "Back to the main assistant".to_string(),
        }))
    }

    fn help(&self) -> &'static str {
        "/language [urdu|english|auto] - Show or pick the language agent"
    }
}
