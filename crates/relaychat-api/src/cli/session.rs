//! Session management CLI commands: list, delete.
//!
//! Reads the local session database directly, so these work whether or not
//! a relay server is running.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;
use dialoguer::Confirm;

use relaychat_types::chat::ChatSession;

use crate::state::AppState;

/// List a user's sessions with title, message count, and timestamps.
///
/// # Examples
///
/// ```bash
/// relaychat sessions list --user alice
/// relaychat sessions list --user alice --json
/// ```
pub async fn list_sessions(state: &AppState, user: &str, json: bool) -> Result<()> {
    let sessions = state.session_service.list_sessions(user).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!();
        println!(
            "  {} No sessions found for '{}'. Start one with: {}",
            style("i").blue().bold(),
            style(user).cyan(),
            style(format!("relaychat chat --user {user}")).yellow()
        );
        println!();
        return Ok(());
    }

    println!();
    println!("  Sessions for '{}'", style(user).cyan().bold());
    println!();
    println!("{}", session_table(&sessions));
    println!();
    println!(
        "  {} session{}",
        style(sessions.len()).bold(),
        if sessions.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

/// Delete a session with confirmation.
///
/// # Examples
///
/// ```bash
/// relaychat sessions delete <session-id> --user alice
/// relaychat sessions delete <session-id> --user alice --force
/// ```
pub async fn delete_session(
    state: &AppState,
    id: &str,
    user: &str,
    force: bool,
    json: bool,
) -> Result<()> {
    let session = state
        .session_service
        .get_session(id, user)
        .await?
        .with_context(|| format!("Session '{id}' not found for '{user}'"))?;

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete session '{}' ({} messages)?",
                style(&session.title).red().bold(),
                session.messages.len()
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    state.session_service.delete_session(id, user).await?;

    if json {
        println!("{}", serde_json::json!({"deleted": true, "session_id": id}));
    } else {
        println!(
            "  {} Session '{}' deleted.",
            style("x").red().bold(),
            session.title
        );
    }

    Ok(())
}

/// Render sessions as a table, numbered from 1 for `/switch <n>`.
pub fn session_table(sessions: &[ChatSession]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("#").fg(Color::White),
        Cell::new("Title").fg(Color::White),
        Cell::new("Messages").fg(Color::White),
        Cell::new("Updated").fg(Color::White),
        Cell::new("ID").fg(Color::White),
    ]);

    for (i, session) in sessions.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1).fg(Color::DarkGrey),
            Cell::new(truncate(&session.title, 40)).fg(Color::Cyan),
            Cell::new(session.user_message_count()).fg(Color::White),
            Cell::new(format_relative(session.updated_at, Utc::now())).fg(Color::DarkGrey),
            Cell::new(&session.id).fg(Color::DarkGrey),
        ]);
    }

    table
}

// --- Formatting helpers ---

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{kept}...")
    } else {
        text.to_string()
    }
}

fn format_relative(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - at).num_seconds();
    if secs < 60 {
        "just now".to_string()
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else if secs < 86_400 {
        format!("{}h ago", secs / 3600)
    } else {
        at.format("%Y-%m-%d").to_string()
    }
}
