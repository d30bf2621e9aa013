use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for a stored conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// Unique identifier for the conversation
    pub id: String,
    /// Derived title
    pub title: String,
    /// When the conversation was first saved
    pub created_at: DateTime<Utc>,
    /// When the conversation was last saved
    pub updated_at: DateTime<Utc>,
    /// Number of messages in the conversation
    pub message_count: usize,
}
