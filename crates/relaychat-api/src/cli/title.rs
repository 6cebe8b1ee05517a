//! `relaychat title`: preview the title a session would get.

use console::style;

use relaychat_core::chat::title::derive_title;
use relaychat_types::chat::Message;

/// Title of a session whose first user message is `text`.
pub fn preview(text: &str) -> String {
    derive_title(&[Message::user(text)])
}

pub fn print_title(text: &str, json: bool) {
    let title = preview(text);
    if json {
        println!("{}", serde_json::json!({"title": title}));
    } else {
        println!("  {} {}", style("Title:").bold(), style(title).cyan());
    }
}
