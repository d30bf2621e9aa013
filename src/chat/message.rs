//! Chat message data model
//!
//! Messages carry a unique id that is monotonic by creation order. A user
//! message is immutable after creation; an assistant message may be
//! appended to while its stream is open, then becomes immutable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide sequence used to keep message ids unique and monotonic
/// even when two messages are created within the same millisecond.
static MESSAGE_SEQ: AtomicU64 = AtomicU64::new(0);

fn next_message_id(now: DateTime<Utc>) -> String {
    let seq = MESSAGE_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{}-{:06}", now.timestamp_millis(), seq)
}

/// Role of a message's author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Sent by the user
    User,
    /// Produced by the completion endpoint (or synthesized locally)
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier, monotonic by creation
    pub id: String,

    /// Author role
    pub role: MessageRole,

    /// Message text
    pub content: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use parlance::chat::{Message, MessageRole};
    ///
    /// let msg = Message::user("Hello!");
    /// assert_eq!(msg.role, MessageRole::User);
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: next_message_id(now),
            role: MessageRole::User,
            content: content.into(),
            created_at: now,
        }
    }

    /// Creates a new assistant message
    ///
    /// Streamed replies start from an empty assistant message that is
    /// appended to fragment by fragment.
    pub fn assistant(content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: next_message_id(now),
            role: MessageRole::Assistant,
            content: content.into(),
            created_at: now,
        }
    }

    /// Append a streamed fragment to this message's content
    pub fn append_fragment(&mut self, fragment: &str) {
        self.content.push_str(fragment);
    }
}
