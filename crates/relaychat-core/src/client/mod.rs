//! Client-side session handling for the terminal chat.
//!
//! - `ConversationBuffer`: the live, append-only message log of one session
//! - `ChatTransport`: how a turn reaches the relay
//! - `DisplayPacer`: paced, cancellable reveal of streamed text
//! - `SaveScheduler`: debounced, sequential persistence
//! - `SessionLifecycleController`: new / switch / delete orchestration

pub mod buffer;
pub mod lifecycle;
pub mod pacer;
pub mod saver;
pub mod transport;
