//! Broker chat assistant CLI entry point.
//!
//! Binary name: `bchat`
//!
//! Parses CLI arguments, sets up tracing, loads config and the conversation
//! store, then dispatches to the command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;

use brokerchat_observe::tracing_setup::{TracingOptions, init_tracing, shutdown_tracing};
use cli::{Cli, Commands, SessionCommand};
use state::{AppState, Overrides};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&tracing_options(&cli))
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

/// Logging follows the output format: `--json` switches log lines to JSON.
fn tracing_options(cli: &Cli) -> TracingOptions {
    TracingOptions {
        json: cli.json,
        enable_otel: cli.otel,
        ..TracingOptions::from_verbosity(cli.verbose, cli.quiet)
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "bchat", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init(Overrides {
        user_id: cli.user_id,
        email: cli.email.clone(),
        assistant_url: cli.assistant_url.clone(),
    })
    .await?;

    match cli.command {
        Commands::Chat { session } => {
            cli::chat::loop_runner::run_chat_loop(&state, session).await?;
        }

        Commands::Sessions { action } => match action {
            SessionCommand::List => {
                cli::session::list_sessions(&state, cli.json).await?;
            }
            SessionCommand::Show { id } => {
                cli::session::show_session(&state, id, cli.json).await?;
            }
            SessionCommand::Export { id } => {
                cli::session::export_session(&state, id, cli.json).await?;
            }
            SessionCommand::Delete { id, force } => {
                cli::session::delete_session(&state, id, force, cli.json).await?;
            }
        },

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}
