//! Chat domain for Parlance
//!
//! This module contains the message and conversation data model and the
//! session orchestrator that drives quota checks, streaming, and
//! persistence.

pub mod conversation;
pub mod message;
pub mod session;

pub use conversation::Conversation;
pub use message::{Message, MessageRole};
pub use session::{
    ChatSession, SessionEvent, SessionObserver, SessionState, SubmitOutcome, FALLBACK_TEXT,
};
