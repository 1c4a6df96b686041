use crate::cli::Args;
use crate::commands::{ChatState, dispatcher::CommandDispatcher};
use crate::config::{Config, Profile, Secrets};
use crate::core::error::TchatError;
use crate::dispatch::Dispatcher;
use crate::display::{self, DisplayMode, TerminalSink};
use crate::guardrails::Guardrails;
use crate::input;
use crate::providers::factory::ProviderFactory;
use crate::session::Session;
use crate::tools::ToolSet;
use console::style;
use is_terminal::IsTerminal;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct Application {
    pub args: Args,
    pub config: Config,
    pub factory: Arc<ProviderFactory>,
    pub dispatcher: Dispatcher,
    pub command_dispatcher: CommandDispatcher,
}

impl Application {
    pub fn new(
        args: Args,
        config: Config,
        secrets: Secrets,
        command_dispatcher: CommandDispatcher,
    ) -> Result<Self, TchatError> {
        let factory = ProviderFactory::new(config.clone(), secrets.clone(), args.model.clone())?;
        let tools = ToolSet::builtin(&config, &secrets)?;
        let dispatcher = Dispatcher::new(
            tools,
            Guardrails::new(&config.guardrails),
            config.max_tool_rounds,
        );

        Ok(Self {
            args,
            config,
            factory: Arc::new(factory),
            dispatcher,
            command_dispatcher,
        })
    }

    pub async fn run(&mut self) -> Result<(), TchatError> {
        if self.args.list_profiles {
            self.list_profiles();
            return Ok(());
        }

        let profile = match &self.args.profile {
            Some(name) => name.parse()?,
            None => self.config.default_profile()?,
        };

        if self.args.chat {
            self.handle_chat_mode(profile).await
        } else {
            let context = if !io::stdin().is_terminal() {
                let mut buffer = String::new();
                io::stdin()
                    .read_to_string(&mut buffer)
                    .map_err(|e| TchatError::Input(format!("Failed to read from stdin: {}", e)))?;
                Some(buffer)
            } else {
                None
            };
            self.handle_one_shot(profile, context).await
        }
    }

    fn list_profiles(&self) {
        let secrets = self.factory.secrets();
        for profile in Profile::ALL {
            let provider = profile.provider();
            let status = if secrets.get(provider.key_env()).is_some() {
                style("ready").green()
            } else {
                style(provider.key_env()).red()
            };
            println!(
                "{:<18} {:<11} {:<40} {}",
                profile.name(),
                provider.label(),
                secrets.get_or(profile.model_env(), profile.default_model()),
                status
            );
        }
    }

    async fn handle_one_shot(
        &self,
        profile: Profile,
        context: Option<String>,
    ) -> Result<(), TchatError> {
        let query = match (self.args.query.as_deref(), context) {
            (Some(q), Some(stdin_ctx)) => format!("<pipe>{}</pipe>\n\n{}", stdin_ctx, q),
            (None, Some(stdin_ctx)) => format!("<pipe>{}</pipe>", stdin_ctx),
            (Some(q), None) => q.to_string(),
            (None, None) => {
                return Err(TchatError::Input(
                    "No query provided. Pass a question or use --chat".to_string(),
                ));
            }
        };

        let mut session = Session::new(self.factory.create(profile)?);
        let interactive = io::stdout().is_terminal();
        let mut sink = TerminalSink::new(DisplayMode::Minimal, profile.name()).without_text();

        let result = self.dispatcher.run_turn(&mut session, &query, &mut sink).await;
        if let Ok(answer) = &result {
            if interactive {
                display::display_answer(answer);
            } else {
                println!("{}", answer);
            }
        }

        if let Some(path) = &self.args.transcript {
            session.finish(path)?;
        }
        result.map(|_| ())
    }

    async fn handle_chat_mode(&self, profile: Profile) -> Result<(), TchatError> {
        let available = self.factory.available_profiles();
        debug!(?available, "configured profiles");

        let bound = self.factory.create(profile)?;
        let model = bound.provider.model().to_string();
        let mut state = ChatState::new(
            Session::new(bound),
            Arc::clone(&self.factory),
            self.dispatcher.tools().schemas(),
            self.config.history_dir(),
        );

        display::display_welcome(profile.name(), &model, state.tools.len());
        let mut editor = input::create_editor(self.command_dispatcher.clone())?;

        loop {
            let line = match state.pending_input.take() {
                Some(queued) => {
                    println!("{} {}", style(">").bold().cyan(), queued);
                    queued
                }
                None => match next_line(input::read_input(&mut editor)) {
                    Some(line) => line,
                    None => break,
                },
            };
            if line.is_empty() {
                continue;
            }

            if let Some(result) = self.command_dispatcher.execute_line(&line, &mut state) {
                match result {
                    Ok(Some(output)) => println!("{}", output),
                    Ok(None) => {}
                    Err(e) => display::display_error(&e.to_string()),
                }
                if !state.should_continue {
                    break;
                }
                continue;
            }

            let label = state.session.profile().name();
            let mut sink = TerminalSink::new(state.display_mode, label);
            if let Err(e) = self
                .dispatcher
                .run_turn(&mut state.session, &line, &mut sink)
                .await
            {
                debug!("turn ended with error: {}", e);
            }
        }

        if let Err(e) = input::save_history(&mut editor) {
            warn!("could not save input history: {}", e);
        }

        let ChatState {
            session,
            history_dir,
            ..
        } = state;
        let path: PathBuf = match &self.args.transcript {
            Some(path) => path.clone(),
            None => session.default_transcript_path(&history_dir),
        };
        let written = session.finish(&path)?;
        display::display_info(&format!("Transcript saved to {}", written.display()));
        Ok(())
    }
}

/// The next chat line, or `None` when the session should end. An input error
/// ends it the same way as Ctrl-D, so the transcript is still written.
fn next_line(read: Result<Option<String>, TchatError>) -> Option<String> {
    match read {
        Ok(line) => line.map(|l| l.trim().to_string()),
        Err(e) => {
            warn!("input error, ending session: {}", e);
            display::display_error(&e.to_string());
            None
        }
    }
}
