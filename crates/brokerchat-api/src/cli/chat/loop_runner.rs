//! Main chat loop.
//!
//! Opens a session (the requested one, else the most recent, else a new
//! one), then reads lines until Ctrl+D or `/exit`. Plain lines are submitted
//! to the assistant; slash commands manage sessions and the CRM context sent
//! along with each message.
//!
//! Once the prompt is up, all output goes through the readline
//! `SharedWriter` so it lands above the line being edited.

use std::io::{self, Write};
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};
use uuid::Uuid;

use brokerchat_core::chat::active::ActiveSession;
use brokerchat_core::chat::orchestrator::TurnOutcome;
use brokerchat_types::assistant::AssistantContext;
use brokerchat_types::error::{AssistantError, AssistantErrorKind, SubmitError};
use brokerchat_types::turn::{Sender, SessionSummary};

use crate::cli::session::{preview, short_id};
use crate::state::{AppState, ConcreteOrchestrator};

use super::banner::print_welcome_banner;
use super::commands::{self, ChatCommand, resolve_session};
use super::input::{ChatInput, InputEvent};

/// Run the interactive chat loop.
pub async fn run_chat_loop(state: &AppState, session: Option<Uuid>) -> anyhow::Result<()> {
    let orchestrator = state.orchestrator()?;

    let session_id = match session {
        Some(id) => {
            if let Err(e) = orchestrator.refresh_sessions().await {
                warn!(error = %e, "Could not load session list");
            }
            orchestrator.select_session(id).await?;
            id
        }
        None => orchestrator.open().await?,
    };

    // The prompt does not own the terminal yet.
    print_welcome_banner(
        &state.identity.email,
        state.assistant_url.as_deref().unwrap_or_default(),
        session_id,
        orchestrator.timeout(),
    );
    let opened = orchestrator.snapshot();
    if !opened.turns.is_empty() {
        println!(
            "  {} Resumed conversation with {} messages. /history to review.",
            style("i").blue().bold(),
            opened.turns.len()
        );
        println!();
    }

    let mut context = AssistantContext::default();
    let (mut chat_input, mut out) = ChatInput::new(Some(session_id))
        .map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;

    loop {
        let text = match chat_input.read_line().await {
            InputEvent::Eof => {
                writeln!(out, "\n  {}", style("Chat ended.").dim())?;
                break;
            }
            InputEvent::Interrupted => {
                writeln!(out, "\n  {}", style("Press Ctrl+D to exit, or keep chatting.").dim())?;
                continue;
            }
            InputEvent::Message(text) if text.is_empty() => continue,
            InputEvent::Message(text) => text,
        };

        let Some(cmd) = commands::parse(&text) else {
            let outcome = with_spinner(orchestrator.submit(&text, context.clone())).await;
            write_outcome(&mut out, outcome)?;
            continue;
        };

        match cmd {
            ChatCommand::Help => commands::write_help(&mut out)?,
            ChatCommand::Clear => chat_input.clear(),
            ChatCommand::Exit => {
                writeln!(out, "\n  {}", style("Chat ended.").dim())?;
                break;
            }
            ChatCommand::New => {
                let id = orchestrator.new_conversation();
                chat_input.set_session(Some(id));
                writeln!(out, "\n  {} New conversation {}\n", style("+").green().bold(), short_id(&id))?;
            }
            ChatCommand::Sessions => match orchestrator.refresh_sessions().await {
                Ok(sessions) => {
                    write_sessions(&mut out, &sessions, orchestrator.snapshot().session_id)?
                }
                Err(e) => write_error(&mut out, &format!("Could not load sessions: {e}"))?,
            },
            ChatCommand::Switch(target) => {
                let Some(id) = find_session(&orchestrator, &target).await else {
                    write_error(&mut out, &format!("No session matches '{target}'. Try /sessions."))?;
                    continue;
                };
                match orchestrator.select_session(id).await {
                    Ok(()) => {
                        chat_input.set_session(Some(id));
                        write_transcript(&mut out, &orchestrator.snapshot(), 6)?;
                    }
                    Err(e) => write_error(&mut out, &format!("Could not open session: {e}"))?,
                }
            }
            ChatCommand::Delete(target) => {
                let Some(id) = find_session(&orchestrator, &target).await else {
                    write_error(&mut out, &format!("No session matches '{target}'. Try /sessions."))?;
                    continue;
                };
                match orchestrator.delete_session(id).await {
                    Ok(active) => {
                        chat_input.set_session(Some(active));
                        writeln!(
                            out,
                            "\n  {} Deleted {}. Now in {}.\n",
                            style("x").red().bold(),
                            short_id(&id),
                            short_id(&active)
                        )?;
                    }
                    Err(e) => write_error(&mut out, &format!("Could not delete session: {e}"))?,
                }
            }
            ChatCommand::History => write_transcript(&mut out, &orchestrator.snapshot(), usize::MAX)?,
            ChatCommand::Retry => {
                let outcome = with_spinner(orchestrator.retry_last(context.clone())).await;
                write_outcome(&mut out, outcome)?;
            }
            ChatCommand::Client(client) => {
                context.selected_client_id = client;
                write_context(&mut out, &context)?;
            }
            ChatCommand::Lenders(ids) => {
                context.selected_lender_ids = ids.into_iter().collect();
                write_context(&mut out, &context)?;
            }
            ChatCommand::Docs(ids) => {
                context.selected_document_ids = ids.into_iter().collect();
                write_context(&mut out, &context)?;
            }
            ChatCommand::Context => write_context(&mut out, &context)?,
            ChatCommand::Unknown(message) => {
                writeln!(
                    out,
                    "\n  {} Unknown command: {}. Type /help for available commands.\n",
                    style("?").yellow().bold(),
                    style(message).dim()
                )?;
            }
        }
    }

    chat_input.finish();
    debug!("Chat loop finished");
    Ok(())
}

/// Resolve against the cached list, refreshing once if nothing matches.
async fn find_session(orchestrator: &ConcreteOrchestrator, target: &str) -> Option<Uuid> {
    if let Some(id) = resolve_session(target, &orchestrator.sessions()) {
        return Some(id);
    }
    let sessions = orchestrator.refresh_sessions().await.ok()?;
    resolve_session(target, &sessions)
}

/// Show a spinner while `fut` runs.
async fn with_spinner<F: std::future::Future>(fut: F) -> F::Output {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("  {spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("thinking...");
    spinner.enable_steady_tick(Duration::from_millis(80));

    let output = fut.await;
    spinner.finish_and_clear();
    output
}

fn write_outcome(
    out: &mut impl Write,
    outcome: Result<TurnOutcome, SubmitError>,
) -> io::Result<()> {
    match outcome {
        Ok(TurnOutcome::Replied {
            reply,
            persisted_turns,
        }) => {
            writeln!(out)?;
            writeln!(out, "  {}", style("Assistant").cyan().bold())?;
            for line in reply.lines() {
                writeln!(out, "  {line}")?;
            }
            if persisted_turns < 2 {
                writeln!(
                    out,
                    "  {}",
                    style("(this exchange could not be saved and won't appear after restart)").dim()
                )?;
            }
            writeln!(out)
        }
        Ok(TurnOutcome::Failed(err)) => {
            writeln!(out, "\n  {} {}", style("!").red().bold(), failure_headline(&err))?;
            writeln!(out, "  {}", style(&err).dim())?;
            if err.is_retryable() {
                writeln!(out, "  {}", style("Type /retry to resend, or keep chatting.").dim())?;
            }
            writeln!(out)
        }
        Err(SubmitError::Busy) => write_error(out, "Still waiting for the last reply."),
        Err(SubmitError::NothingToRetry) => write_error(out, "Nothing to retry."),
        Err(err) => write_error(out, &err.to_string()),
    }
}

fn failure_headline(err: &AssistantError) -> &'static str {
    match err.kind() {
        AssistantErrorKind::Timeout => "The assistant took too long to answer.",
        AssistantErrorKind::Transport => "Could not reach the assistant.",
        AssistantErrorKind::Protocol => "The assistant could not answer.",
        AssistantErrorKind::Validation => "The message could not be sent.",
    }
}

fn write_sessions(
    out: &mut impl Write,
    sessions: &[SessionSummary],
    active: Option<Uuid>,
) -> io::Result<()> {
    writeln!(out)?;
    if sessions.is_empty() {
        writeln!(out, "  {}", style("No saved conversations yet.").dim())?;
    }
    for line in session_lines(sessions, active) {
        writeln!(out, "{line}")?;
    }
    writeln!(out)
}

fn session_lines(sessions: &[SessionSummary], active: Option<Uuid>) -> Vec<String> {
    sessions
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let marker = if Some(s.session_id) == active { "*" } else { " " };
            format!(
                "  {marker} {:>2}. {}  {}  {}",
                i + 1,
                short_id(&s.session_id),
                s.last_message_at.format("%Y-%m-%d %H:%M"),
                preview(&s.preview_message, 50)
            )
        })
        .collect()
}

/// Write the last `limit` turns of the active transcript.
fn write_transcript(out: &mut impl Write, active: &ActiveSession, limit: usize) -> io::Result<()> {
    writeln!(out)?;
    if active.turns.is_empty() {
        writeln!(out, "  {}", style("No messages in this conversation yet.").dim())?;
    }
    let skip = active.turns.len().saturating_sub(limit);
    if skip > 0 {
        writeln!(out, "  {}", style(format!("... {skip} earlier messages")).dim())?;
    }
    for turn in active.turns.iter().skip(skip) {
        let label = match turn.sender {
            Sender::User => style("You").green().bold(),
            Sender::Assistant => style("Assistant").cyan().bold(),
        };
        writeln!(out, "  {label} {}", preview(&turn.message, 100))?;
    }
    if let Some(err) = &active.last_error {
        writeln!(out, "  {} last send failed: {err}", style("!").red().bold())?;
    }
    writeln!(out)
}

fn write_context(out: &mut impl Write, context: &AssistantContext) -> io::Result<()> {
    writeln!(out)?;
    for line in context_lines(context) {
        writeln!(out, "  {line}")?;
    }
    writeln!(out)
}

fn context_lines(context: &AssistantContext) -> Vec<String> {
    if context.is_empty() {
        return vec!["No context attached.".to_string()];
    }
    let mut lines = Vec::new();
    if let Some(client) = &context.selected_client_id {
        lines.push(format!("Client:    {}", short_id(client)));
    }
    if !context.selected_lender_ids.is_empty() {
        lines.push(format!("Lenders:   {}", join_ids(&context.selected_lender_ids)));
    }
    if !context.selected_document_ids.is_empty() {
        lines.push(format!("Documents: {}", join_ids(&context.selected_document_ids)));
    }
    lines
}

fn join_ids<'a>(ids: impl IntoIterator<Item = &'a Uuid>) -> String {
    ids.into_iter().map(short_id).collect::<Vec<_>>().join(", ")
}

fn write_error(out: &mut impl Write, message: &str) -> io::Result<()> {
    writeln!(out, "\n  {} {message}\n", style("!").yellow().bold())
}
