//! Display pacer: reveals streamed text one character per tick.
//!
//! Arrival timing and display timing are decoupled. Fragments are appended
//! to a [`RevealBuffer`] as they arrive; a spawned reveal loop moves one
//! character at a time into the shared [`TranscriptView`]. The revealed text
//! is always a prefix of the received text.
//!
//! A reveal loop only writes while the view is still showing its turn. When
//! the user switches sessions the view is detached or handed to a new turn,
//! and the stale loop stops without touching it.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Identifies one chat turn within a controller.
pub type TurnId = u64;

/// Received vs. revealed text for one turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevealBuffer {
    received: Vec<char>,
    revealed: usize,
    completed: bool,
}

impl RevealBuffer {
    pub fn push(&mut self, fragment: &str) {
        self.received.extend(fragment.chars());
    }

    /// No more fragments will arrive.
    pub fn complete(&mut self) {
        self.completed = true;
    }

    /// Advance the reveal by one character.
    pub fn next_char(&mut self) -> Option<char> {
        let c = self.received.get(self.revealed).copied()?;
        self.revealed += 1;
        Some(c)
    }

    pub fn received_len(&self) -> usize {
        self.received.len()
    }

    pub fn revealed_len(&self) -> usize {
        self.revealed
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn has_pending(&self) -> bool {
        self.revealed < self.received.len()
    }

    pub fn is_drained(&self) -> bool {
        self.completed && !self.has_pending()
    }

    pub fn received_text(&self) -> String {
        self.received.iter().collect()
    }

    pub fn revealed_text(&self) -> String {
        self.received[..self.revealed].iter().collect()
    }
}

type Echo = Box<dyn FnMut(char) + Send>;

/// What the user currently sees of the assistant's answer.
#[derive(Default)]
pub struct TranscriptView {
    turn: Option<TurnId>,
    text: String,
    echo: Option<Echo>,
}

impl fmt::Debug for TranscriptView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranscriptView")
            .field("turn", &self.turn)
            .field("text", &self.text)
            .finish_non_exhaustive()
    }
}

impl TranscriptView {
    pub fn new() -> Self {
        Self::default()
    }

    /// A view that also forwards every revealed character, e.g. to a terminal.
    pub fn with_echo(echo: impl FnMut(char) + Send + 'static) -> Self {
        Self {
            turn: None,
            text: String::new(),
            echo: Some(Box::new(echo)),
        }
    }

    /// Start showing `turn`, clearing any previous text.
    pub fn begin_turn(&mut self, turn: TurnId) {
        self.turn = Some(turn);
        self.text.clear();
    }

    /// Stop showing any turn. Stale reveal loops will no longer write.
    pub fn detach(&mut self) {
        self.turn = None;
    }

    pub fn showing(&self) -> Option<TurnId> {
        self.turn
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    fn reveal(&mut self, c: char) {
        self.text.push(c);
        if let Some(echo) = self.echo.as_mut() {
            echo(c);
        }
    }
}

pub type SharedTranscript = Arc<Mutex<TranscriptView>>;

pub fn shared_transcript(view: TranscriptView) -> SharedTranscript {
    Arc::new(Mutex::new(view))
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

/// How a reveal loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacerOutcome {
    /// Everything received was revealed.
    Drained(String),
    /// The turn was cancelled.
    Cancelled { revealed: String },
    /// The view moved on to another turn or was detached.
    Superseded { revealed: String },
}

struct PacerShared {
    buffer: Mutex<RevealBuffer>,
    wake: Notify,
}

/// Paces the reveal of one turn's text.
pub struct DisplayPacer {
    turn: TurnId,
    shared: Arc<PacerShared>,
    cancel: CancellationToken,
    task: JoinHandle<PacerOutcome>,
}

impl DisplayPacer {
    /// Claim `view` for `turn` and start revealing at one character per
    /// `interval`. A zero interval reveals as fast as text arrives.
    pub fn start(turn: TurnId, view: SharedTranscript, interval: Duration) -> Self {
        lock(&view).begin_turn(turn);

        let shared = Arc::new(PacerShared {
            buffer: Mutex::new(RevealBuffer::default()),
            wake: Notify::new(),
        });
        let cancel = CancellationToken::new();
        let task = tokio::spawn(reveal_loop(
            turn,
            Arc::clone(&shared),
            view,
            interval,
            cancel.clone(),
        ));

        Self {
            turn,
            shared,
            cancel,
            task,
        }
    }

    pub fn turn(&self) -> TurnId {
        self.turn
    }

    /// Queue a fragment for reveal.
    pub fn push(&self, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        lock(&self.shared.buffer).push(fragment);
        self.shared.wake.notify_one();
    }

    /// Mark the text complete; the loop exits once it has caught up.
    pub fn finish(&self) {
        lock(&self.shared.buffer).complete();
        self.shared.wake.notify_one();
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Snapshot of what has been received and revealed so far.
    pub fn snapshot(&self) -> RevealBuffer {
        lock(&self.shared.buffer).clone()
    }

    /// Wait for the reveal loop to end.
    pub async fn drained(self) -> PacerOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(err) => {
                debug!(turn = self.turn, error = %err, "Reveal loop aborted");
                PacerOutcome::Cancelled {
                    revealed: lock(&self.shared.buffer).revealed_text(),
                }
            }
        }
    }
}

async fn reveal_loop(
    turn: TurnId,
    shared: Arc<PacerShared>,
    view: SharedTranscript,
    interval: Duration,
    cancel: CancellationToken,
) -> PacerOutcome {
    let mut ticker = (!interval.is_zero()).then(|| {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });
    let revealed = || lock(&shared.buffer).revealed_text();

    loop {
        let (pending, drained) = {
            let buffer = lock(&shared.buffer);
            (buffer.has_pending(), buffer.is_drained())
        };
        if drained {
            return PacerOutcome::Drained(revealed());
        }

        if !pending {
            // Caught up with arrivals; a notify_one permit survives until here,
            // so a push between the check and the await is not lost.
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return PacerOutcome::Cancelled { revealed: revealed() },
                _ = shared.wake.notified() => continue,
            }
        }

        if let Some(ticker) = ticker.as_mut() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return PacerOutcome::Cancelled { revealed: revealed() },
                _ = ticker.tick() => {}
            }
        } else if cancel.is_cancelled() {
            return PacerOutcome::Cancelled { revealed: revealed() };
        }

        let superseded = {
            let mut shown = lock(&view);
            if shown.showing() == Some(turn) {
                if let Some(c) = lock(&shared.buffer).next_char() {
                    shown.reveal(c);
                }
                false
            } else {
                true
            }
        };
        if superseded {
            debug!(turn, "Transcript moved on, stopping reveal");
            return PacerOutcome::Superseded { revealed: revealed() };
        }

        if ticker.is_none() {
            tokio::task::yield_now().await;
        }
    }
}
