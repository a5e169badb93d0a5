//! Chat transports
//!
//! `Transport` is the outbound half (messages, edits, typing, callback
//! answers); `UpdateSource` is the inbound half yielding decoded events.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

mod console;
mod telegram;

pub use console::ConsoleTransport;
pub use telegram::TelegramTransport;

use crate::domain::{ChatId, MessageRef};
use crate::nav::Button;
use crate::session::Event;

/// Keyboard attached to a message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Markup {
    /// Leave or remove any keyboard
    #[default]
    None,
    /// Persistent reply keyboard of button labels
    Reply(Vec<Vec<String>>),
    /// Inline buttons under the message
    Inline(Vec<Vec<Button>>),
}

/// Transport failures
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {description}")]
    Api { status: u16, description: String },

    #[error("Message is not modified")]
    NotModified,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport closed")]
    Closed,
}

impl TransportError {
    /// True when retrying against the same message can never succeed
    ///
    /// The message is gone, the bot is forbidden or unauthorized, or the
    /// transport is closed. Rate limits, 5xx and network errors are transient.
    pub fn is_terminal(&self) -> bool {
        match self {
            TransportError::Api { status, .. } => matches!(status, 400 | 401 | 403 | 404),
            TransportError::Closed | TransportError::Io(_) => true,
            TransportError::Network(_)
            | TransportError::RateLimited { .. }
            | TransportError::NotModified
            | TransportError::InvalidResponse(_) => false,
        }
    }
}

/// Outbound chat operations
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a new message and return a handle for later edits
    async fn send_message(&self, chat: ChatId, text: &str, markup: Markup) -> Result<MessageRef, TransportError>;

    /// Replace the text (and inline buttons) of a sent message
    async fn edit_message(&self, target: &MessageRef, text: &str, markup: Markup) -> Result<(), TransportError>;

    /// Show a "typing…" indicator
    async fn send_typing(&self, chat: ChatId) -> Result<(), TransportError>;

    /// Acknowledge a button press, optionally with a toast or alert
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>, alert: bool) -> Result<(), TransportError>;
}

/// Inbound events
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Wait for the next batch of events; `Closed` ends the stream
    async fn next_events(&self) -> Result<Vec<Event>, TransportError>;
}
