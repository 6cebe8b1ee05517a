//! Interactive terminal chat against a relay server.
//!
//! Answers are revealed at a steady pace as they stream in, sessions are
//! saved in the background, and slash commands switch between them.
//! Entry point: `loop_runner::run_chat_loop`.

pub mod commands;
pub mod input;
pub mod loop_runner;
pub mod renderer;
