//! Slash command parsing for the chat loop.
//!
//! Commands start with `/` and provide in-chat controls for sessions, the
//! CRM context attached to each message, and help.

use std::io::{self, Write};

use console::style;
use uuid::Uuid;

use brokerchat_types::turn::SessionSummary;

/// Available slash commands in the chat loop.
#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    /// Show available commands.
    Help,
    /// Clear the terminal screen.
    Clear,
    /// Exit the chat.
    Exit,
    /// Start a new conversation.
    New,
    /// List sessions.
    Sessions,
    /// Switch to a session (list number, id, or id prefix).
    Switch(String),
    /// Delete a session (list number, id, or id prefix).
    Delete(String),
    /// Show the current transcript.
    History,
    /// Resend the last message after a failure.
    Retry,
    /// Select a client; `None` clears it.
    Client(Option<Uuid>),
    /// Select lenders; empty clears them.
    Lenders(Vec<Uuid>),
    /// Select documents; empty clears them.
    Docs(Vec<Uuid>),
    /// Show the selected context.
    Context,
    /// Unknown command or bad arguments.
    Unknown(String),
}

/// Parse user input as a slash command.
///
/// Returns `None` if the input doesn't start with `/`.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let parts: Vec<&str> = trimmed.splitn(2, ' ').collect();
    let cmd = parts[0].to_lowercase();
    let arg = parts
        .get(1)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let command = match cmd.as_str() {
        "/help" | "/h" | "/?" => ChatCommand::Help,
        "/clear" | "/cls" => ChatCommand::Clear,
        "/exit" | "/quit" | "/q" => ChatCommand::Exit,
        "/new" => ChatCommand::New,
        "/sessions" | "/ls" => ChatCommand::Sessions,
        "/history" => ChatCommand::History,
        "/retry" | "/r" => ChatCommand::Retry,
        "/context" | "/ctx" => ChatCommand::Context,
        "/switch" | "/open" => match arg {
            Some(target) => ChatCommand::Switch(target),
            None => ChatCommand::Unknown("/switch requires a session".to_string()),
        },
        "/delete" | "/del" => match arg {
            Some(target) => ChatCommand::Delete(target),
            None => ChatCommand::Unknown("/delete requires a session".to_string()),
        },
        "/client" => match arg.as_deref() {
            None | Some("none") => ChatCommand::Client(None),
            Some(id) => match Uuid::parse_str(id) {
                Ok(id) => ChatCommand::Client(Some(id)),
                Err(_) => ChatCommand::Unknown(format!("invalid client id: {id}")),
            },
        },
        "/lenders" => parse_id_list(arg.as_deref(), "lender", ChatCommand::Lenders),
        "/docs" | "/documents" => parse_id_list(arg.as_deref(), "document", ChatCommand::Docs),
        other => ChatCommand::Unknown(other.to_string()),
    };
    Some(command)
}

/// Parse a comma- or space-separated id list. `none` or no argument clears.
fn parse_id_list(
    arg: Option<&str>,
    what: &str,
    make: fn(Vec<Uuid>) -> ChatCommand,
) -> ChatCommand {
    let Some(arg) = arg.filter(|a| *a != "none") else {
        return make(Vec::new());
    };
    let mut ids = Vec::new();
    for raw in arg.split([',', ' ']).filter(|s| !s.is_empty()) {
        match Uuid::parse_str(raw) {
            Ok(id) => ids.push(id),
            Err(_) => return ChatCommand::Unknown(format!("invalid {what} id: {raw}")),
        }
    }
    make(ids)
}

/// Resolve a session reference typed by the user against the listed
/// sessions: a 1-based list number, a full id, or a unique id prefix.
pub fn resolve_session(target: &str, sessions: &[SessionSummary]) -> Option<Uuid> {
    if let Ok(index) = target.parse::<usize>() {
        if let Some(session) = index.checked_sub(1).and_then(|i| sessions.get(i)) {
            return Some(session.session_id);
        }
    }
    if let Ok(id) = Uuid::parse_str(target) {
        return Some(id);
    }

    let prefix = target.to_lowercase();
    let mut matches = sessions
        .iter()
        .filter(|s| s.session_id.to_string().starts_with(&prefix));
    match (matches.next(), matches.next()) {
        (Some(only), None) => Some(only.session_id),
        _ => None,
    }
}

/// Write the help text listing all available commands.
pub fn write_help(out: &mut impl Write) -> io::Result<()> {
    let rows = [
        ("/help", "Show this help message"),
        ("/new", "Start a new conversation"),
        ("/sessions", "List your conversations"),
        ("/switch <n|id>", "Open a conversation"),
        ("/delete <n|id>", "Delete a conversation"),
        ("/history", "Show this conversation"),
        ("/retry", "Resend the last message after an error"),
        ("/client <id|none>", "Attach a client to your messages"),
        ("/lenders <ids|none>", "Attach lenders"),
        ("/docs <ids|none>", "Attach documents"),
        ("/context", "Show what is attached"),
        ("/clear", "Clear the screen"),
        ("/exit", "Leave the chat"),
    ];

    writeln!(out)?;
    writeln!(out, "  {}", style("Available commands:").bold())?;
    writeln!(out)?;
    for (cmd, desc) in rows {
        writeln!(out, "  {:<22} {}", style(cmd).cyan(), desc)?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "  {}",
        style("Ctrl+D to exit. Messages are saved after each reply.").dim()
    )?;
    writeln!(out)
}
