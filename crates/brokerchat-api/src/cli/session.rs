//! Session management CLI commands: list, show, export, delete.
//!
//! Provides session browsing with rich tables, Markdown/JSON export,
//! and deletion with confirmation prompt.

use std::fmt::Write as _;

use anyhow::{Context, Result, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Confirm;
use uuid::Uuid;

use brokerchat_core::chat::repository::TurnRepository;
use brokerchat_types::turn::{ConversationTurn, Sender};

use crate::state::AppState;

/// List the broker's sessions, newest first.
///
/// # Examples
///
/// ```bash
/// bchat sessions list
/// bchat sessions list --json
/// ```
pub async fn list_sessions(state: &AppState, json: bool) -> Result<()> {
    let sessions = state
        .session_manager()
        .list_sessions(&state.identity.user_id)
        .await
        .context("Failed to load sessions")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!();
        println!(
            "  {} No conversations yet. Start one with: {}",
            style("i").blue().bold(),
            style("bchat chat").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Session").fg(Color::White),
        Cell::new("Last message").fg(Color::White),
        Cell::new("Preview").fg(Color::White),
    ]);

    for session in &sessions {
        table.add_row(vec![
            Cell::new(session.session_id.to_string()).fg(Color::Cyan),
            Cell::new(session.last_message_at.format("%Y-%m-%d %H:%M").to_string())
                .fg(Color::White),
            Cell::new(preview(&session.preview_message, 60)).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("  Conversations for {}", style(&state.identity.email).cyan().bold());
    println!();
    println!("{table}");
    println!();
    println!(
        "  {} session{}",
        style(sessions.len()).bold(),
        if sessions.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

/// Print a session's transcript in the terminal.
pub async fn show_session(state: &AppState, session_id: Uuid, json: bool) -> Result<()> {
    let turns = load_turns(state, session_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&turns)?);
        return Ok(());
    }

    println!();
    for turn in &turns {
        let label = match turn.sender {
            Sender::User => style("You").green().bold(),
            Sender::Assistant => style("Assistant").cyan().bold(),
        };
        println!(
            "  {} {}",
            label,
            style(turn.created_at.format("%Y-%m-%d %H:%M")).dim()
        );
        for line in turn.message.lines() {
            println!("    {line}");
        }
        println!();
    }

    Ok(())
}

/// Export a session as Markdown (default) or JSON.
///
/// # Examples
///
/// ```bash
/// bchat sessions export <session-id> > chat.md
/// bchat sessions export <session-id> --json
/// ```
pub async fn export_session(state: &AppState, session_id: Uuid, json: bool) -> Result<()> {
    let turns = load_turns(state, session_id).await?;

    if json {
        let export = serde_json::json!({
            "session_id": session_id,
            "turns": turns,
        });
        println!("{}", serde_json::to_string_pretty(&export)?);
        return Ok(());
    }

    print!("{}", render_markdown(session_id, &turns));
    Ok(())
}

/// Delete a session with confirmation.
///
/// # Examples
///
/// ```bash
/// bchat sessions delete <session-id>
/// bchat sessions delete <session-id> --force
/// ```
pub async fn delete_session(state: &AppState, session_id: Uuid, force: bool, json: bool) -> Result<()> {
    let turns = load_turns(state, session_id).await?;

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete session {} ({} messages)?",
                style(short_id(&session_id)).red().bold(),
                turns.len()
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    let deletion = state
        .session_manager()
        .delete_session(session_id, &state.identity.user_id)
        .await
        .context("Failed to delete session")?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "deleted": true,
                "session_id": session_id.to_string(),
                "deleted_turns": deletion.deleted_turns,
            })
        );
    } else {
        println!(
            "  {} Session {} deleted ({} messages).",
            style("x").red().bold(),
            short_id(&session_id),
            deletion.deleted_turns
        );
    }

    Ok(())
}

async fn load_turns(state: &AppState, session_id: Uuid) -> Result<Vec<ConversationTurn>> {
    let turns = state
        .repo
        .fetch_turns(&state.identity.user_id, &session_id)
        .await
        .context("Failed to load session")?;
    if turns.is_empty() {
        bail!("Session '{session_id}' not found");
    }
    Ok(turns)
}

// --- Formatting helpers ---

fn render_markdown(session_id: Uuid, turns: &[ConversationTurn]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Conversation {}", short_id(&session_id));
    let _ = writeln!(out);
    if let (Some(first), Some(last)) = (turns.first(), turns.last()) {
        let _ = writeln!(out, "- **Started:** {}", first.created_at.format("%Y-%m-%d %H:%M UTC"));
        let _ = writeln!(out, "- **Last message:** {}", last.created_at.format("%Y-%m-%d %H:%M UTC"));
    }
    let _ = writeln!(out, "- **Messages:** {}", turns.len());
    let _ = writeln!(out);
    let _ = writeln!(out, "---");
    let _ = writeln!(out);

    for turn in turns {
        let label = match turn.sender {
            Sender::User => "**You**",
            Sender::Assistant => "**Assistant**",
        };
        let _ = writeln!(out, "### {label} ({})", turn.created_at.format("%H:%M"));
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", turn.message);
        let _ = writeln!(out);
    }
    out
}

/// First line of `text`, cut to `max` characters.
pub(crate) fn preview(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > max {
        let cut: String = line.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        line.to_string()
    }
}

pub(crate) fn short_id(id: &Uuid) -> String {
    id.to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use brokerchat_types::turn::NewTurn;

    fn turn(session_id: Uuid, sender: Sender, message: &str) -> ConversationTurn {
        ConversationTurn::local(NewTurn {
            user_id: Uuid::now_v7(),
            session_id,
            sender,
            message: message.to_string(),
        })
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("ééééééééééééé", 8), "ééééé...");
        assert_eq!(preview("first line\nsecond", 40), "first line");
        assert_eq!(preview("", 10), "");
    }

    #[test]
    fn test_render_markdown_lists_turns_in_order() {
        let session_id = Uuid::now_v7();
        let turns = vec![
            turn(session_id, Sender::User, "What's the rate on FHA loans?"),
            turn(session_id, Sender::Assistant, "FHA rates are..."),
        ];
        let md = render_markdown(session_id, &turns);

        assert!(md.starts_with(&format!("# Conversation {}", short_id(&session_id))));
        assert!(md.contains("- **Messages:** 2"));
        let you = md.find("### **You**").unwrap();
        let assistant = md.find("### **Assistant**").unwrap();
        assert!(you < assistant);
        assert!(md.contains("FHA rates are..."));
    }

    #[test]
    fn test_short_id() {
        let id = Uuid::parse_str("0190f5a4-7b3c-7def-8123-456789abcdef").unwrap();
        assert_eq!(short_id(&id), "0190f5a4");
    }
}
