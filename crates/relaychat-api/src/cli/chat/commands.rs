//! Slash command parsing for the chat loop.
//!
//! Commands start with `/` and provide in-chat controls for session
//! management and help.

use console::style;

use relaychat_types::chat::ChatSession;

/// Available slash commands in the chat loop.
#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    /// Show available commands.
    Help,
    /// Start a new session.
    New,
    /// List stored sessions.
    Sessions,
    /// Switch to a session by listing number or id.
    Switch(String),
    /// Delete a session by listing number or id.
    Delete(String),
    /// Show the active conversation.
    History,
    /// Start over and let the relay forget the current conversation.
    Clear,
    /// Exit the chat.
    Exit,
    /// Unknown or malformed command.
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

    let (cmd, arg) = match trimmed.split_once(' ') {
        Some((cmd, arg)) => (cmd.to_lowercase(), arg.trim()),
        None => (trimmed.to_lowercase(), ""),
    };

    let command = match cmd.as_str() {
        "/help" | "/h" | "/?" => ChatCommand::Help,
        "/new" => ChatCommand::New,
        "/sessions" | "/ls" => ChatCommand::Sessions,
        "/switch" | "/open" => match arg {
            "" => ChatCommand::Unknown("/switch requires a session number or id".to_string()),
            target => ChatCommand::Switch(target.to_string()),
        },
        "/delete" | "/rm" => match arg {
            "" => ChatCommand::Unknown("/delete requires a session number or id".to_string()),
            target => ChatCommand::Delete(target.to_string()),
        },
        "/history" => ChatCommand::History,
        "/clear" | "/cls" => ChatCommand::Clear,
        "/exit" | "/quit" | "/q" => ChatCommand::Exit,
        other => ChatCommand::Unknown(other.to_string()),
    };
    Some(command)
}

/// Resolve a `/switch` or `/delete` argument against the listing.
///
/// Accepts a 1-based listing number, a full id, or an unambiguous id prefix.
pub fn resolve_target(sessions: &[ChatSession], target: &str) -> Option<String> {
    if let Ok(n) = target.parse::<usize>() {
        if (1..=sessions.len()).contains(&n) {
            return Some(sessions[n - 1].id.clone());
        }
    }
    if let Some(exact) = sessions.iter().find(|s| s.id == target) {
        return Some(exact.id.clone());
    }

    let mut matches = sessions.iter().filter(|s| s.id.starts_with(target));
    match (matches.next(), matches.next()) {
        (Some(only), None) => Some(only.id.clone()),
        _ => None,
    }
}

/// Help text listing all available commands.
pub fn help_text() -> String {
    let rows = [
        ("/help", "Show this help message"),
        ("/new", "Start a new session"),
        ("/sessions", "List your sessions"),
        ("/switch <n|id>", "Open another session"),
        ("/delete <n|id>", "Delete a session"),
        ("/history", "Show this conversation"),
        ("/clear", "Start over in a fresh session"),
        ("/exit", "End the chat"),
    ];

    let mut text = format!("\n  {}\n\n", style("Available commands:").bold());
    for (cmd, description) in rows {
        text.push_str(&format!("  {} {description}\n", style(format!("{cmd:<16}")).cyan()));
    }
    text.push_str(&format!(
        "\n  {}\n",
        style("Ctrl+C stops a streaming answer, Ctrl+D exits").dim()
    ));
    text
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn session(id: &str) -> ChatSession {
        let now = Utc::now();
        ChatSession {
            id: id.to_string(),
            owner: "u1".to_string(),
            messages: Vec::new(),
            title: "New Chat".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_parse_help() {
        assert_eq!(parse("/help"), Some(ChatCommand::Help));
        assert_eq!(parse("/h"), Some(ChatCommand::Help));
        assert_eq!(parse("/?"), Some(ChatCommand::Help));
    }

    #[test]
    fn test_parse_exit() {
        assert_eq!(parse("/exit"), Some(ChatCommand::Exit));
        assert_eq!(parse("/QUIT"), Some(ChatCommand::Exit));
        assert_eq!(parse("/q"), Some(ChatCommand::Exit));
    }

    #[test]
    fn test_parse_switch_and_delete() {
        assert_eq!(
            parse("/switch 2"),
            Some(ChatCommand::Switch("2".to_string()))
        );
        assert_eq!(
            parse("/delete  abc "),
            Some(ChatCommand::Delete("abc".to_string()))
        );
        assert!(matches!(parse("/switch"), Some(ChatCommand::Unknown(_))));
        assert!(matches!(parse("/delete   "), Some(ChatCommand::Unknown(_))));
    }

    #[test]
    fn test_help_lists_every_command() {
        let help = console::strip_ansi_codes(&help_text()).to_string();
        for cmd in ["/help", "/new", "/sessions", "/switch", "/delete", "/history", "/clear", "/exit"] {
            assert!(help.contains(cmd), "missing {cmd}");
        }
    }

    #[test]
    fn test_parse_not_command() {
        assert_eq!(parse("hello world"), None);
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(
            parse("/foo"),
            Some(ChatCommand::Unknown("/foo".to_string()))
        );
    }

    #[test]
    fn test_resolve_by_number() {
        let sessions = vec![session("aaa-1"), session("bbb-2")];
        assert_eq!(resolve_target(&sessions, "2").as_deref(), Some("bbb-2"));
        assert_eq!(resolve_target(&sessions, "3"), None);
        assert_eq!(resolve_target(&sessions, "0"), None);
    }

    #[test]
    fn test_resolve_by_id_and_prefix() {
        let sessions = vec![session("aaa-1"), session("aab-2"), session("bbb-3")];
        assert_eq!(resolve_target(&sessions, "aab-2").as_deref(), Some("aab-2"));
        assert_eq!(resolve_target(&sessions, "bb").as_deref(), Some("bbb-3"));
        // Ambiguous prefix.
        assert_eq!(resolve_target(&sessions, "aa"), None);
        assert_eq!(resolve_target(&sessions, "zzz"), None);
    }
}
