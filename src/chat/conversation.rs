//! Conversation data model and title derivation
//!
//! A conversation is a persisted, titled, ordered sequence of messages.
//! Messages are append-only during a session and replaced wholesale when a
//! stored conversation is loaded.

use crate::chat::message::{Message, MessageRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum derived-title length before truncation
const TITLE_MAX_CHARS: usize = 30;

/// A titled, ordered sequence of messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique identifier (UUID v4)
    pub id: String,

    /// Derived title (see [`Conversation::derive_title`])
    pub title: String,

    /// Ordered message list
    pub messages: Vec<Message>,

    /// Fixed at first save
    pub created_at: DateTime<Utc>,

    /// Refreshed on every save
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a fresh conversation opened by a canned assistant greeting
    pub fn with_greeting(greeting: &str) -> Self {
        let now = Utc::now();
        let mut conversation = Self {
            id: Uuid::new_v4().to_string(),
            title: String::new(),
            messages: vec![Message::assistant(greeting)],
            created_at: now,
            updated_at: now,
        };
        conversation.title = conversation.derive_title();
        conversation
    }

    /// Derive the display title from the message list
    ///
    /// Deterministic and idempotent: the first user message truncated to 30
    /// characters (with an ellipsis when truncated), or a date-stamped
    /// placeholder when no user message exists yet.
    pub fn derive_title(&self) -> String {
        match self
            .messages
            .iter()
            .find(|m| m.role == MessageRole::User)
        {
            Some(msg) => {
                let content = msg.content.trim();
                if content.chars().count() > TITLE_MAX_CHARS {
                    let truncated: String = content.chars().take(TITLE_MAX_CHARS).collect();
                    format!("{}...", truncated)
                } else {
                    content.to_string()
                }
            }
            None => format!("Chat {}", self.created_at.format("%Y-%m-%d %H:%M")),
        }
    }

    /// Append a message to the conversation
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Mutable access to the most recent message
    ///
    /// Used by the session to append streamed fragments to the in-progress
    /// assistant message.
    pub fn last_message_mut(&mut self) -> Option<&mut Message> {
        self.messages.last_mut()
    }

    /// Number of messages in the conversation
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true when the conversation has no messages
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_greeting_starts_with_assistant_message() {
        let conversation = Conversation::with_greeting("Hello! How can I help?");
        assert_eq!(conversation.len(), 1);
        assert_eq!(conversation.messages[0].role, MessageRole::Assistant);
        assert_eq!(conversation.messages[0].content, "Hello! How can I help?");
    }

    #[test]
    fn test_title_from_short_user_message_is_verbatim() {
        let mut conversation = Conversation::with_greeting("hi");
        conversation.push(Message::user("What is Rust?"));
        assert_eq!(conversation.derive_title(), "What is Rust?");
    }

    #[test]
    fn test_title_truncates_long_user_message_with_ellipsis() {
        let mut conversation = Conversation::with_greeting("hi");
        conversation.push(Message::user(
            "Explain the difference between owned and borrowed values in Rust",
        ));
        let title = conversation.derive_title();
        assert_eq!(title, "Explain the difference between...");
        assert_eq!(title.chars().count(), TITLE_MAX_CHARS + 3);
    }

    #[test]
    fn test_title_without_user_message_is_date_stamped() {
        let conversation = Conversation::with_greeting("hi");
        let title = conversation.derive_title();
        assert!(title.starts_with("Chat "));
        assert!(title.contains(&conversation.created_at.format("%Y-%m-%d").to_string()));
    }

    #[test]
    fn test_title_derivation_is_idempotent() {
        let mut conversation = Conversation::with_greeting("hi");
        conversation.push(Message::user("A question about lifetimes and borrowing"));
        let first = conversation.derive_title();
        let second = conversation.derive_title();
        assert_eq!(first, second);
    }

    #[test]
    fn test_title_skips_assistant_messages() {
        let mut conversation = Conversation::with_greeting("A very long greeting message here");
        conversation.push(Message::user("short"));
        assert_eq!(conversation.derive_title(), "short");
    }

    #[test]
    fn test_title_truncation_respects_char_boundaries() {
        let mut conversation = Conversation::with_greeting("hi");
        conversation.push(Message::user("héllo wörld ünïcödé çharacters ére pads"));
        // Must not panic on multi-byte characters.
        let title = conversation.derive_title();
        assert!(title.ends_with("..."));
    }
}
