//! The interactive chat loop.
//!
//! Drives a [`SessionLifecycleController`] over HTTP against a running relay
//! server. Answers are revealed through the transcript echo while input keeps
//! being read, so Ctrl+C can stop a turn mid-stream.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use console::style;

use relaychat_core::chat::store::SessionStore;
use relaychat_core::client::lifecycle::{LifecycleConfig, SessionLifecycleController};
use relaychat_core::client::pacer::{shared_transcript, TranscriptView};
use relaychat_core::client::transport::ChatTransport;
use relaychat_infra::remote::chat::HttpChatTransport;
use relaychat_infra::remote::session::HttpSessionStore;
use relaychat_types::config::GlobalConfig;
use relaychat_types::identity::UserIdentity;

use super::commands::{self, help_text, resolve_target, ChatCommand};
use super::input::{ChatInput, InputEvent};
use super::renderer::ChatRenderer;

/// Whether the loop keeps reading input after a command or turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Lifecycle settings for `owner` taken from the loaded config.
pub fn lifecycle_config(config: &GlobalConfig, owner: &str) -> LifecycleConfig {
    let mut lifecycle = LifecycleConfig::new(owner);
    lifecycle.greeting = config.session.greeting.clone();
    lifecycle.debounce = Duration::from_millis(config.session.debounce_ms);
    lifecycle.reveal_interval = Duration::from_millis(config.client.reveal_interval_ms);
    lifecycle
}

/// Run the chat until the user exits.
pub async fn run_chat_loop(
    config: &GlobalConfig,
    identity: &UserIdentity,
    server: &str,
    resume: Option<&str>,
) -> anyhow::Result<()> {
    let store = Arc::new(HttpSessionStore::new(server)?);
    let transport = Arc::new(HttpChatTransport::new(server)?);

    let prompt = format!("  {} ", style("You >").green().bold());
    let (mut input, writer) =
        ChatInput::new(prompt).map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;

    let renderer = ChatRenderer::new(writer);
    let view = shared_transcript(TranscriptView::with_echo(renderer.echo()));
    let controller = SessionLifecycleController::new(
        lifecycle_config(config, identity.owner()),
        store,
        transport,
        view,
    );

    let mut chat = ChatLoop::new(controller, renderer);
    if let Err(e) = chat.start(server, resume).await {
        input.flush();
        return Err(e);
    }

    loop {
        match input.read_line().await {
            InputEvent::Eof => break,
            InputEvent::Interrupted => {
                chat.renderer
                    .info("Press Ctrl+D to exit, or keep chatting.");
            }
            InputEvent::Message(text) => {
                if text.is_empty() {
                    continue;
                }
                let flow = match commands::parse(&text) {
                    Some(ChatCommand::Clear) => {
                        input.clear();
                        chat.handle_command(ChatCommand::Clear).await
                    }
                    Some(command) => chat.handle_command(command).await,
                    None => chat.run_turn(&text, &mut input).await,
                };
                if flow == Flow::Exit {
                    break;
                }
            }
        }
    }

    chat.renderer.info("Saving and closing...");
    chat.shutdown().await;
    input.flush();
    Ok(())
}

pub struct ChatLoop<S, T, W>
where
    S: SessionStore + 'static,
    T: ChatTransport + 'static,
    W: Write + Clone + Send + 'static,
{
    controller: SessionLifecycleController<S, T>,
    renderer: ChatRenderer<W>,
}

impl<S, T, W> ChatLoop<S, T, W>
where
    S: SessionStore + 'static,
    T: ChatTransport + 'static,
    W: Write + Clone + Send + 'static,
{
    pub fn new(controller: SessionLifecycleController<S, T>, renderer: ChatRenderer<W>) -> Self {
        Self {
            controller,
            renderer,
        }
    }

    /// Load the listing, open the requested session, and greet.
    pub async fn start(&mut self, server: &str, resume: Option<&str>) -> anyhow::Result<()> {
        if let Err(e) = self.controller.refresh_sessions().await {
            tracing::warn!(error = %e, "Could not load sessions");
            self.renderer.warn(&format!("Could not load sessions: {e}"));
        }

        if let Some(target) = resume {
            let id = resolve_target(self.controller.sessions(), target)
                .ok_or_else(|| anyhow::anyhow!("Session '{target}' not found"))?;
            self.controller.switch_session(&id).await?;
        }

        self.renderer.print_welcome(
            self.controller.owner(),
            server,
            self.controller.active_session_id(),
        );
        self.renderer.print_messages(self.controller.messages());
        Ok(())
    }

    /// Send one prompt and reveal the answer. Ctrl+C stops the turn;
    /// Ctrl+D stops it and ends the chat.
    pub async fn run_turn(&mut self, text: &str, input: &mut ChatInput) -> Flow {
        self.renderer.start_turn();
        if let Err(e) = self.controller.submit(text) {
            self.renderer.end_turn(None);
            self.renderer.warn(&e.to_string());
            return Flow::Continue;
        }

        let canceller = self.controller.turn_canceller();
        let mut flow = Flow::Continue;
        let result = {
            let turn = self.controller.next_turn_event();
            tokio::pin!(turn);
            loop {
                tokio::select! {
                    result = &mut turn => break result,
                    event = input.read_line() => match event {
                        InputEvent::Interrupted | InputEvent::Eof => {
                            if matches!(event, InputEvent::Eof) {
                                flow = Flow::Exit;
                            }
                            if let Some(canceller) = &canceller {
                                canceller.cancel();
                            }
                        }
                        InputEvent::Message(_) => {
                            self.renderer.warn("Still answering. Press Ctrl+C to stop.");
                        }
                    },
                }
            }
        };

        match result {
            Ok(event) => self.renderer.end_turn(Some(&event)),
            Err(e) => {
                self.renderer.end_turn(None);
                self.renderer.error(&e.to_string());
            }
        }
        flow
    }

    pub async fn handle_command(&mut self, command: ChatCommand) -> Flow {
        match command {
            ChatCommand::Help => self.renderer.write_block(&help_text()),
            ChatCommand::New => {
                let id = self.controller.new_session().await.to_string();
                self.renderer.success(&format!("New session {id}"));
                self.renderer.print_messages(self.controller.messages());
            }
            ChatCommand::Sessions => {
                if let Err(e) = self.controller.refresh_sessions().await {
                    self.renderer
                        .warn(&format!("Could not refresh sessions, showing last known: {e}"));
                }
                self.renderer.print_sessions(
                    self.controller.sessions(),
                    self.controller.active_session_id(),
                );
            }
            ChatCommand::Switch(target) => {
                let Some(id) = self.resolve(&target).await else {
                    self.renderer.warn(&format!("No session matches '{target}'. Try /sessions."));
                    return Flow::Continue;
                };
                match self.controller.switch_session(&id).await {
                    Ok(()) => {
                        self.renderer.success(&format!("Switched to session {id}"));
                        self.renderer.print_messages(self.controller.messages());
                    }
                    Err(e) => self.renderer.error(&e.to_string()),
                }
            }
            ChatCommand::Delete(target) => {
                let Some(id) = self.resolve(&target).await else {
                    self.renderer.warn(&format!("No session matches '{target}'. Try /sessions."));
                    return Flow::Continue;
                };
                let was_active = id == self.controller.active_session_id();
                match self.controller.delete_session(&id).await {
                    Ok(()) => {
                        self.renderer.success(&format!("Deleted session {id}"));
                        if was_active {
                            self.renderer.print_messages(self.controller.messages());
                        }
                    }
                    Err(e) => self.renderer.error(&format!("Delete failed: {e}")),
                }
            }
            ChatCommand::History => self.renderer.print_messages(self.controller.messages()),
            ChatCommand::Clear => {
                let id = self.controller.clear_session().await.to_string();
                self.renderer.success(&format!("Started over in session {id}"));
                self.renderer.print_messages(self.controller.messages());
            }
            ChatCommand::Exit => return Flow::Exit,
            ChatCommand::Unknown(name) => {
                self.renderer.warn(&format!(
                    "Unknown command: {}. Type /help for available commands.",
                    style(name).dim()
                ));
            }
        }
        Flow::Continue
    }

    /// Resolve against the current listing, refreshing once on a miss.
    async fn resolve(&mut self, target: &str) -> Option<String> {
        if let Some(id) = resolve_target(self.controller.sessions(), target) {
            return Some(id);
        }
        if let Err(e) = self.controller.refresh_sessions().await {
            tracing::debug!(error = %e, "Refresh before resolving a session failed");
            return None;
        }
        resolve_target(self.controller.sessions(), target)
    }

    pub async fn shutdown(self) {
        self.controller.shutdown().await;
    }
}
