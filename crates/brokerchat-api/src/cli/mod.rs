//! CLI command definitions for the `bchat` binary.
//!
//! Uses clap derive macros for argument parsing. Identity and the assistant
//! endpoint can come from flags, environment variables, or `config.toml`.

pub mod chat;
pub mod session;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use uuid::Uuid;

/// Chat with the mortgage-broker assistant and manage past conversations.
#[derive(Parser)]
#[command(name = "bchat", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text. Log lines on
    /// stderr become JSON objects too.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans to stdout via OpenTelemetry.
    #[arg(long, global = true, hide = true)]
    pub otel: bool,

    /// Broker user id (overrides `[identity]` in config.toml).
    #[arg(long, global = true, env = "BROKERCHAT_USER_ID")]
    pub user_id: Option<Uuid>,

    /// Broker email (overrides `[identity]` in config.toml).
    #[arg(long, global = true, env = "BROKERCHAT_USER_EMAIL")]
    pub email: Option<String>,

    /// Assistant webhook URL (overrides `[assistant]` in config.toml).
    #[arg(long, global = true, env = "BROKERCHAT_ASSISTANT_URL")]
    pub assistant_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive chat with the assistant.
    Chat {
        /// Open this session instead of the most recent one.
        #[arg(long)]
        session: Option<Uuid>,
    },

    /// Browse and manage past conversations.
    #[command(alias = "s")]
    Sessions {
        #[command(subcommand)]
        action: SessionCommand,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum SessionCommand {
    /// List sessions, most recent first.
    #[command(alias = "ls")]
    List,

    /// Print a session's transcript.
    Show {
        /// Session ID.
        id: Uuid,
    },

    /// Export a session as Markdown (or JSON with --json).
    Export {
        /// Session ID.
        id: Uuid,
    },

    /// Delete every turn of a session.
    #[command(alias = "rm")]
    Delete {
        /// Session ID.
        id: Uuid,

        /// Skip confirmation prompt.
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_chat_with_session() {
        let id = Uuid::now_v7();
        let cli = Cli::try_parse_from(["bchat", "-vv", "chat", "--session", &id.to_string()])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Chat { session } => assert_eq!(session, Some(id)),
            _ => panic!("expected chat command"),
        }
    }

    #[test]
    fn test_parse_sessions_delete_force() {
        let id = Uuid::now_v7();
        let cli = Cli::try_parse_from([
            "bchat",
            "--json",
            "sessions",
            "rm",
            &id.to_string(),
            "--force",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Sessions {
                action: SessionCommand::Delete { id: parsed, force },
            } => {
                assert_eq!(parsed, id);
                assert!(force);
            }
            _ => panic!("expected sessions delete"),
        }
    }

    #[test]
    fn test_invalid_session_id_rejected() {
        assert!(Cli::try_parse_from(["bchat", "sessions", "show", "not-a-uuid"]).is_err());
    }
}
