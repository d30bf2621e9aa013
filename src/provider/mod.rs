//! Completion provider abstraction for Parlance
//!
//! The completion endpoint is an opaque HTTP service; this module defines
//! the client seam the chat session talks to, the wire message types, and
//! the HTTP implementation.

pub mod http;

pub use http::{HttpCompletionClient, IMAGE_UNSUPPORTED_NOTICE};

use crate::error::Result;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// A finite, non-restartable sequence of streamed text fragments
///
/// Dropping the stream releases the underlying transport; nothing partial
/// is persisted mid-stream.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Client seam for the completion endpoint
///
/// The chat session depends on this trait rather than a concrete HTTP
/// client so tests can script fragment sequences and failures.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send the full conversation so far and stream back the reply
    ///
    /// # Arguments
    ///
    /// * `messages` - Ordered role/content pairs, including the newest
    ///   user message
    ///
    /// # Errors
    ///
    /// Returns `ParlanceError::Provider` on connection failure or a
    /// non-success status; there is no retry.
    async fn stream_completion(&self, messages: &[OutboundMessage]) -> Result<FragmentStream>;
}

/// A role/content pair as sent to the completion endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Message role ("user" or "assistant")
    pub role: String,
    /// Message content, plain text or structured
    pub content: OutboundContent,
}

impl OutboundMessage {
    /// Create a plain-text outbound message
    pub fn text(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: OutboundContent::Text(content.into()),
        }
    }
}

/// Outbound message content
///
/// Normally plain text, but the wire format also admits a structured form
/// carrying an image reference. Image content is never forwarded to the
/// endpoint; the client short-circuits it locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutboundContent {
    /// Plain text content
    Text(String),
    /// Structured content with optional text and image fields
    Rich {
        /// Optional text portion
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        /// Optional image reference (data URL or remote URL)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image: Option<String>,
    },
}

impl OutboundContent {
    /// Returns true when the content carries an image field
    pub fn has_image(&self) -> bool {
        matches!(self, Self::Rich { image: Some(_), .. })
    }
}
