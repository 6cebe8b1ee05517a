//! Outgoing-context policy for the canned session greeting.

use relaychat_types::chat::Message;

/// Remove the canned greeting from a short conversation.
///
/// The greeting is dropped when it is the only assistant turn and the
/// conversation holds at most one user turn, so the model does not anchor on
/// it. If removing it would leave nothing to send, the input is returned as is.
pub fn filter_greeting(messages: &[Message], greeting: &str) -> Vec<Message> {
    let user_turns = messages.iter().filter(|m| m.is_user()).count();
    let mut assistant_turns = messages.iter().filter(|m| !m.is_user());

    let lone_greeting = match (assistant_turns.next(), assistant_turns.next()) {
        (Some(only), None) => only.content == greeting,
        _ => false,
    };
    if !lone_greeting || user_turns > 1 {
        return messages.to_vec();
    }

    let filtered: Vec<Message> = messages.iter().filter(|m| m.is_user()).cloned().collect();
    if filtered.is_empty() {
        messages.to_vec()
    } else {
        filtered
    }
}
