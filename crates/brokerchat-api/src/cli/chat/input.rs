//! Async readline input for the chat loop.
//!
//! Wraps `rustyline_async::Readline` so Ctrl+D ends the chat and Ctrl+C only
//! clears the current line.

use rustyline_async::{Readline, ReadlineError, ReadlineEvent, SharedWriter};
use uuid::Uuid;

/// Events produced by the input handler.
#[derive(Debug)]
pub enum InputEvent {
    /// User submitted a line (trimmed, possibly empty).
    Message(String),
    /// End of file (Ctrl+D).
    Eof,
    /// Interrupt signal (Ctrl+C).
    Interrupted,
}

/// Async input handler wrapping rustyline_async.
pub struct ChatInput {
    rl: Readline,
}

impl ChatInput {
    /// Create the input handler with a prompt for `session_id`.
    ///
    /// The returned `SharedWriter` prints above the prompt without
    /// corrupting the line being edited.
    pub fn new(session_id: Option<Uuid>) -> Result<(Self, SharedWriter), ReadlineError> {
        let (rl, stdout) = Readline::new(prompt_for(session_id))?;
        Ok((Self { rl }, stdout))
    }

    /// Point the prompt at another session.
    pub fn set_session(&mut self, session_id: Option<Uuid>) {
        let _ = self.rl.update_prompt(&prompt_for(session_id));
    }

    /// Read a line of input.
    pub async fn read_line(&mut self) -> InputEvent {
        match self.rl.readline().await {
            Ok(ReadlineEvent::Line(line)) => {
                let trimmed = line.trim().to_string();
                if !trimmed.is_empty() {
                    let _ = self.rl.add_history_entry(trimmed.clone());
                }
                InputEvent::Message(trimmed)
            }
            Ok(ReadlineEvent::Eof) => InputEvent::Eof,
            Ok(ReadlineEvent::Interrupted) => InputEvent::Interrupted,
            Err(_) => InputEvent::Eof,
        }
    }

    /// Clear the terminal screen.
    pub fn clear(&mut self) {
        let _ = self.rl.clear();
    }

    /// Flush pending output and restore the terminal.
    pub fn finish(&mut self) {
        let _ = self.rl.flush();
    }
}

fn prompt_for(session_id: Option<Uuid>) -> String {
    let tag = session_id
        .map(|id| id.to_string()[..8].to_string())
        .unwrap_or_else(|| "--------".to_string());
    format!(
        "  {} {} ",
        console::style(tag).dim(),
        console::style("You >").green().bold()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_shows_short_session_id() {
        let id = Uuid::parse_str("0190f5a4-7b3c-7def-8123-456789abcdef").unwrap();
        let prompt = console::strip_ansi_codes(&prompt_for(Some(id))).to_string();
        assert_eq!(prompt, "  0190f5a4 You > ");
    }

    #[test]
    fn test_prompt_without_session() {
        let prompt = console::strip_ansi_codes(&prompt_for(None)).to_string();
        assert!(prompt.contains("--------"));
    }
}
