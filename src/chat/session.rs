//! Chat session orchestration
//!
//! The session owns the active conversation and drives a send through its
//! states: `Idle -> Sending -> Streaming -> Idle`. The quota policy gates
//! every send, the completion client streams the reply, and the store
//! persists the result. Rendering is decoupled through the observer seam:
//! the session emits events, subscribers draw.

use crate::account::{self, QuotaDecision, User};
use crate::chat::conversation::Conversation;
use crate::chat::message::{Message, MessageRole};
use crate::error::Result;
use crate::provider::{CompletionClient, OutboundMessage};
use crate::storage::{ConversationSummary, SqliteStorage};
use chrono::Utc;
use futures::StreamExt;
use std::sync::Arc;

/// Fixed assistant text substituted when the completion call fails
pub const FALLBACK_TEXT: &str = "Sorry, I encountered an error. Please try again.";

/// Send-lifecycle state of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepting new input
    Idle,
    /// User message appended, request in flight
    Sending,
    /// Fragments arriving
    Streaming,
}

/// Events emitted by the session for subscribers to render
///
/// The session never prints; the CLI renderer (or a test probe) is a pure
/// subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The send-lifecycle state changed
    StateChanged(SessionState),
    /// A message was appended to the active conversation
    MessageAppended {
        /// Id of the appended message
        message_id: String,
        /// Author role
        role: MessageRole,
    },
    /// A fragment was appended to the in-progress assistant message
    MessageUpdated {
        /// Id of the message being streamed into
        message_id: String,
        /// The fragment just appended, in arrival order
        fragment: String,
    },
    /// A send was refused by the quota policy
    QuotaDenied {
        /// Human-readable denial reason
        reason: String,
    },
}

/// Subscriber to session events
pub trait SessionObserver: Send {
    /// Called synchronously for every event, in emission order
    fn on_event(&self, event: &SessionEvent);
}

/// Outcome of a submit attempt
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The reply streamed to completion (or the fallback was substituted)
    /// and the conversation was persisted
    Completed,
    /// Input was empty or whitespace-only; nothing was appended
    EmptyInput,
    /// A send was already in flight; nothing was appended
    Busy,
    /// The quota policy refused the send; nothing was appended and no
    /// quota was consumed
    QuotaDenied(QuotaDecision),
}

/// Orchestrator for one user's chat session
///
/// Holds the session user as an explicitly injected context object (not a
/// global): `init` loads from persistence, `teardown` clears the slot.
pub struct ChatSession {
    user: User,
    storage: Arc<SqliteStorage>,
    client: Arc<dyn CompletionClient>,
    greeting: String,
    conversation: Conversation,
    state: SessionState,
    observers: Vec<Box<dyn SessionObserver>>,
}

impl ChatSession {
    /// Initialize a session for the given user
    ///
    /// Resumes the most recently updated stored conversation, or starts a
    /// fresh greeting conversation when none exist.
    pub fn init(
        user: User,
        storage: Arc<SqliteStorage>,
        client: Arc<dyn CompletionClient>,
        greeting: impl Into<String>,
    ) -> Result<Self> {
        let greeting = greeting.into();

        let conversation = match storage.list_conversations()?.first() {
            Some(summary) => storage
                .load_conversation(&summary.id)?
                .unwrap_or_else(|| Conversation::with_greeting(&greeting)),
            None => Conversation::with_greeting(&greeting),
        };

        tracing::debug!(conversation = %conversation.id, "session initialized");

        Ok(Self {
            user,
            storage,
            client,
            greeting,
            conversation,
            state: SessionState::Idle,
            observers: Vec::new(),
        })
    }

    /// Subscribe to session events
    pub fn subscribe(&mut self, observer: Box<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    /// The current send-lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The active conversation
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// The session user
    pub fn user(&self) -> &User {
        &self.user
    }

    /// Evaluate the quota policy for the session user right now
    pub fn quota_status(&self) -> QuotaDecision {
        account::evaluate(&self.user, Utc::now())
    }

    /// Submit user input for a streamed reply
    ///
    /// Rejects empty input and rejects (never queues) a submit while a
    /// send is in flight. The quota policy is checked before anything is
    /// appended; on acceptance the daily counter is recorded exactly once,
    /// before the remote call is confirmed. Transport errors are recovered
    /// by substituting the fixed fallback assistant message. On return the
    /// session is Idle and the conversation persisted.
    pub async fn submit(&mut self, input: &str) -> Result<SubmitOutcome> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(SubmitOutcome::EmptyInput);
        }
        if self.state != SessionState::Idle {
            return Ok(SubmitOutcome::Busy);
        }

        let now = Utc::now();
        let decision = account::evaluate(&self.user, now);
        if !decision.can_send {
            let reason = decision.reason.clone().unwrap_or_default();
            self.emit(&SessionEvent::QuotaDenied { reason });
            return Ok(SubmitOutcome::QuotaDenied(decision));
        }

        self.set_state(SessionState::Sending);

        let user_message = Message::user(input);
        self.emit(&SessionEvent::MessageAppended {
            message_id: user_message.id.clone(),
            role: MessageRole::User,
        });
        self.conversation.push(user_message);

        account::record_send(&mut self.user, now);
        if let Err(e) = self.storage.persist_user(&self.user) {
            tracing::warn!(error = %e, "failed to persist quota counter");
        }

        if let Err(e) = self.stream_reply().await {
            tracing::warn!(error = %e, "completion failed, substituting fallback");
            self.substitute_fallback();
        }

        self.set_state(SessionState::Idle);
        self.persist_conversation()?;

        Ok(SubmitOutcome::Completed)
    }

    /// Drive the completion stream into a fresh assistant message
    async fn stream_reply(&mut self) -> Result<()> {
        let outbound: Vec<OutboundMessage> = self
            .conversation
            .messages
            .iter()
            .map(|m| OutboundMessage::text(m.role.to_string(), m.content.clone()))
            .collect();

        let mut stream = self.client.stream_completion(&outbound).await?;

        let assistant = Message::assistant("");
        let message_id = assistant.id.clone();
        self.conversation.push(assistant);
        self.emit(&SessionEvent::MessageAppended {
            message_id: message_id.clone(),
            role: MessageRole::Assistant,
        });
        self.set_state(SessionState::Streaming);

        while let Some(fragment) = stream.next().await {
            let fragment = fragment?;
            if let Some(message) = self.conversation.last_message_mut() {
                message.append_fragment(&fragment);
            }
            self.emit(&SessionEvent::MessageUpdated {
                message_id: message_id.clone(),
                fragment,
            });
        }

        Ok(())
    }

    /// Recover from a failed send by surfacing the fixed fallback text
    ///
    /// If the streamed assistant message never received a fragment, its
    /// content becomes the fallback; otherwise a new fallback message is
    /// appended after the partial one.
    fn substitute_fallback(&mut self) {
        match self.conversation.messages.last_mut() {
            Some(last) if last.role == MessageRole::Assistant && last.content.is_empty() => {
                last.content = FALLBACK_TEXT.to_string();
                let message_id = last.id.clone();
                self.emit(&SessionEvent::MessageUpdated {
                    message_id,
                    fragment: FALLBACK_TEXT.to_string(),
                });
            }
            _ => {
                let fallback = Message::assistant(FALLBACK_TEXT);
                let message_id = fallback.id.clone();
                self.conversation.push(fallback);
                self.emit(&SessionEvent::MessageAppended {
                    message_id: message_id.clone(),
                    role: MessageRole::Assistant,
                });
                self.emit(&SessionEvent::MessageUpdated {
                    message_id,
                    fragment: FALLBACK_TEXT.to_string(),
                });
            }
        }
    }

    /// Start a fresh conversation with the canned greeting
    ///
    /// Other stored conversations are untouched. The new conversation is
    /// not persisted until its first send.
    pub fn new_chat(&mut self) {
        self.conversation = Conversation::with_greeting(&self.greeting);
        tracing::debug!(conversation = %self.conversation.id, "started new chat");
    }

    /// Switch to a stored conversation, replacing the message list wholesale
    ///
    /// Returns false when no conversation matches the id.
    pub fn switch_to(&mut self, id: &str) -> Result<bool> {
        match self.storage.load_conversation(id)? {
            Some(conversation) => {
                self.conversation = conversation;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Delete a stored conversation
    ///
    /// If the active conversation was deleted, the most recently updated
    /// survivor becomes active; when none remain, a fresh greeting
    /// conversation is created.
    pub fn delete_chat(&mut self, id: &str) -> Result<()> {
        let deleting_active =
            self.conversation.id == id || (id.len() < 36 && self.conversation.id.starts_with(id));

        self.storage.delete_conversation(id)?;

        if deleting_active {
            match self.storage.list_conversations()?.first() {
                Some(summary) => {
                    if let Some(conversation) = self.storage.load_conversation(&summary.id)? {
                        self.conversation = conversation;
                    } else {
                        self.new_chat();
                    }
                }
                None => self.new_chat(),
            }
        }

        Ok(())
    }

    /// List stored conversations, most recent first
    pub fn list_chats(&self) -> Result<Vec<ConversationSummary>> {
        self.storage.list_conversations()
    }

    /// End the session, clearing the current-user slot
    pub fn teardown(self) -> Result<()> {
        self.storage.clear_user()
    }

    fn persist_conversation(&mut self) -> Result<()> {
        self.conversation.title = self.conversation.derive_title();
        self.conversation.updated_at = Utc::now();
        self.storage.upsert_conversation(&self.conversation)
    }

    fn set_state(&mut self, state: SessionState) {
        self.state = state;
        self.emit(&SessionEvent::StateChanged(state));
    }

    fn emit(&self, event: &SessionEvent) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }

    #[cfg(test)]
    fn force_state(&mut self, state: SessionState) {
        self.state = state;
    }
}
