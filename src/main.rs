use clap::Parser;
use std::process::ExitCode;
use toolchat::app::Application;
use toolchat::cli::Args;
use toolchat::commands::create_command_registry;
use toolchat::config::{Config, Secrets};
use toolchat::display;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    // RUST_LOG wins over -v
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match dotenvy::dotenv() {
        Ok(path) => info!("Read dotenv file from: {}", path.display()),
        Err(dotenvy::Error::Io(io_error))
            if io_error.kind() == std::io::ErrorKind::NotFound =>
        {
            info!("Couldn't find a dotenv file");
        }
        Err(err) => display::display_error(&format!("Ignoring unreadable .env file: {}", err)),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            display::display_error(&e.to_string());
            return ExitCode::FAILURE;
        }
    };
    let secrets = Secrets::from_env();

    let result = match Application::new(args, config, secrets, create_command_registry()) {
        Ok(mut app) => app.run().await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        // turn errors were already shown while the turn ran
        Err(e) if e.is_turn_fatal() => ExitCode::FAILURE,
        Err(e) => {
            display::display_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
