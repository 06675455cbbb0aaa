//! Chat message log
//!
//! Defines chat turns and the append-only store that holds them for the
//! lifetime of the chat window.

use chrono::{DateTime, Local};
use serde::Serialize;

/// Monotonic identifier of a message within one store
pub type MessageId = u64;

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message typed by the shopper
    User,
    /// Message from the shopping assistant (including local notices)
    Assistant,
}

impl MessageRole {
    /// Convert the role to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// A single chat turn
///
/// Fields are private so a message cannot change once it is in the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    id: MessageId,
    role: MessageRole,
    content: String,
    timestamp: DateTime<Local>,
}

impl ChatMessage {
    /// Unique, increasing identifier
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Who sent the message
    pub fn role(&self) -> MessageRole {
        self.role
    }

    /// Text payload
    pub fn content(&self) -> &str {
        &self.content
    }

    /// When the message was appended
    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }
}

/// Ordered, append-only sequence of chat turns
///
/// Insertion order is display order.
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    messages: Vec<ChatMessage>,
    next_id: MessageId,
}

impl MessageStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return a reference to it
    pub fn append(
        &mut self,
        role: MessageRole,
        content: impl Into<String>,
        timestamp: DateTime<Local>,
    ) -> &ChatMessage {
        self.next_id += 1;
        self.messages.push(ChatMessage {
            id: self.next_id,
            role,
            content: content.into(),
            timestamp,
        });
        &self.messages[self.messages.len() - 1]
    }

    /// All messages in display order
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }
}
