//! Terminal output for the chat loop.
//!
//! Everything is written through one writer (the readline `SharedWriter` in
//! the real loop) so output never tears the input prompt. Assistant text
//! arrives one character at a time from the transcript echo; a thinking
//! spinner runs until the first character shows up.

use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use relaychat_core::client::lifecycle::TurnEvent;
use relaychat_types::chat::{ChatSession, Message, MessageRole};

use crate::cli::session::session_table;

#[derive(Default)]
struct TurnState {
    spinner: Option<ProgressBar>,
    answering: bool,
}

fn lock(state: &Mutex<TurnState>) -> MutexGuard<'_, TurnState> {
    state.lock().unwrap_or_else(|p| p.into_inner())
}

fn thinking_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::default_spinner().template("  {spinner:.cyan} {msg}") {
        spinner.set_style(template);
    }
    spinner.set_message("thinking...");
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

pub struct ChatRenderer<W: Write + Clone + Send + 'static> {
    out: W,
    turn: Arc<Mutex<TurnState>>,
}

impl<W: Write + Clone + Send + 'static> ChatRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            turn: Arc::default(),
        }
    }

    /// Character sink for `TranscriptView::with_echo`.
    pub fn echo(&self) -> impl FnMut(char) + Send + 'static {
        let mut out = self.out.clone();
        let turn = Arc::clone(&self.turn);
        move |c| {
            let mut turn = lock(&turn);
            if !turn.answering {
                if let Some(spinner) = turn.spinner.take() {
                    spinner.finish_and_clear();
                }
                turn.answering = true;
                let _ = write!(out, "\n  {} ", style("Assistant").cyan().bold());
            }
            let _ = write!(out, "{c}");
            let _ = out.flush();
        }
    }

    /// A turn was submitted: show the spinner until text arrives.
    pub fn start_turn(&self) {
        let mut turn = lock(&self.turn);
        turn.answering = false;
        turn.spinner = Some(thinking_spinner());
    }

    /// Close the answer line of a finished turn.
    pub fn end_turn(&mut self, event: Option<&TurnEvent>) {
        let answered = {
            let mut turn = lock(&self.turn);
            if let Some(spinner) = turn.spinner.take() {
                spinner.finish_and_clear();
            }
            std::mem::take(&mut turn.answering)
        };

        if let Some(TurnEvent::Discarded { .. }) = event {
            let _ = writeln!(self.out, "  {}", style("(stopped)").dim());
        }
        if answered {
            let _ = writeln!(self.out);
        }
        let _ = writeln!(self.out);
    }

    pub fn print_welcome(&mut self, user: &str, server: &str, session_id: &str) {
        let _ = writeln!(self.out);
        let _ = writeln!(
            self.out,
            "  {} {}",
            style("relaychat").cyan().bold(),
            style(env!("CARGO_PKG_VERSION")).dim()
        );
        let _ = writeln!(
            self.out,
            "  {} {}  {} {}",
            style("user").dim(),
            user,
            style("server").dim(),
            server
        );
        let _ = writeln!(self.out, "  {} {}", style("session").dim(), session_id);
        let _ = writeln!(
            self.out,
            "  {}",
            style("Type /help for commands, Ctrl+D to exit").dim()
        );
        let _ = writeln!(self.out);
    }

    /// Print a whole conversation.
    pub fn print_messages(&mut self, messages: &[Message]) {
        for message in messages {
            let label = match message.role {
                MessageRole::User => style("You").green().bold(),
                MessageRole::Assistant => style("Assistant").cyan().bold(),
            };
            let _ = writeln!(self.out, "  {label} {}", message.content);
        }
        let _ = writeln!(self.out);
    }

    pub fn print_sessions(&mut self, sessions: &[ChatSession], active_id: &str) {
        if sessions.is_empty() {
            self.info("No saved sessions yet.");
            return;
        }
        let _ = writeln!(self.out);
        let _ = writeln!(self.out, "{}", session_table(sessions));
        let _ = writeln!(self.out, "  {} {}", style("active").dim(), active_id);
        let _ = writeln!(self.out);
    }

    pub fn write_block(&mut self, text: &str) {
        let _ = write!(self.out, "{text}");
        let _ = self.out.flush();
    }

    pub fn info(&mut self, text: &str) {
        let _ = writeln!(self.out, "\n  {} {text}\n", style("i").blue().bold());
    }

    pub fn success(&mut self, text: &str) {
        let _ = writeln!(self.out, "\n  {} {text}\n", style("*").cyan().bold());
    }

    pub fn warn(&mut self, text: &str) {
        let _ = writeln!(self.out, "\n  {} {text}\n", style("!").yellow().bold());
    }

    pub fn error(&mut self, text: &str) {
        let _ = writeln!(self.out, "\n  {} {text}\n", style("!").red().bold());
    }
}
