//! Telegram Bot API transport
//!
//! Outbound calls are JSON POSTs to `{base}/bot{token}/{method}`; inbound
//! updates come from `getUpdates` long polling. The token is part of every
//! URL, so URLs are never logged and reqwest errors are stripped of theirs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::debug;

use super::{Markup, Transport, TransportError, UpdateSource};
use crate::config::TelegramConfig;
use crate::domain::{ChatId, MessageRef, UserId};
use crate::nav::{CallbackAction, CallbackError};
use crate::session::{CallbackQuery, Event, Trigger};

const NOT_MODIFIED: &str = "message is not modified";

/// Default wait when a 429 carries no `retry_after`
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// Bot API envelope
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<u16>,
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    retry_after: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Update {
    update_id: i64,
    message: Option<TgMessage>,
    callback_query: Option<TgCallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    message_id: i64,
    chat: TgChat,
    from: Option<TgUser>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TgUser {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TgCallbackQuery {
    id: String,
    from: TgUser,
    message: Option<TgMessage>,
    data: Option<String>,
}

/// Map one update to an event
///
/// Only text messages and button presses are events; everything else
/// (stickers, edits, joins) is ignored.
pub(crate) fn decode_update(update: Update) -> Option<Event> {
    if let Some(query) = update.callback_query {
        let user = UserId(query.from.id);
        let message = query
            .message
            .as_ref()
            .map(|m| MessageRef::new(ChatId(m.chat.id), m.message_id));
        // Private chats share the user's id
        let chat = message.map(|m| m.chat).unwrap_or(ChatId(query.from.id));
        let action = match query.data.as_deref() {
            Some(data) => CallbackAction::decode(data),
            None => Err(CallbackError::Malformed(String::new())),
        };
        let callback = CallbackQuery {
            id: query.id,
            message,
            action,
        };
        return Some(Event::new(user, chat, Trigger::Callback(callback)));
    }

    let message = update.message?;
    let from = message.from?;
    let text = message.text?;
    Some(Event::text(UserId(from.id), ChatId(message.chat.id), &text))
}

/// `reply_markup` value for a keyboard, if any
fn markup_json(markup: &Markup) -> Option<Value> {
    match markup {
        Markup::None => None,
        Markup::Reply(rows) => {
            let keyboard: Vec<Vec<Value>> = rows
                .iter()
                .map(|row| row.iter().map(|label| json!({ "text": label })).collect())
                .collect();
            Some(json!({ "keyboard": keyboard, "resize_keyboard": true }))
        }
        Markup::Inline(rows) => {
            let keyboard: Vec<Vec<Value>> = rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|b| json!({ "text": b.label, "callback_data": b.data }))
                        .collect()
                })
                .collect();
            Some(json!({ "inline_keyboard": keyboard }))
        }
    }
}

/// Turn a failed envelope into a transport error
fn api_error(status: u16, description: Option<String>, parameters: Option<ResponseParameters>) -> TransportError {
    let description = description.unwrap_or_default();
    if status == 429 {
        let secs = parameters
            .and_then(|p| p.retry_after)
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        return TransportError::RateLimited {
            retry_after: Duration::from_secs(secs),
        };
    }
    if description.contains(NOT_MODIFIED) {
        return TransportError::NotModified;
    }
    TransportError::Api { status, description }
}

/// Telegram Bot API client
pub struct TelegramTransport {
    http: Client,
    /// `{base}/bot{token}`; never log this
    endpoint: String,
    poll_timeout_secs: u64,
    offset: Mutex<i64>,
}

impl TelegramTransport {
    pub fn new(config: &TelegramConfig, token: &str) -> Result<Self, TransportError> {
        debug!(base_url = %config.base_url, "TelegramTransport::new: called");
        let http = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| TransportError::Network(e.without_url()))?;

        Ok(Self {
            http,
            endpoint: format!("{}/bot{}", config.base_url.trim_end_matches('/'), token),
            poll_timeout_secs: config.poll_timeout_secs,
            offset: Mutex::new(0),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: Value) -> Result<T, TransportError> {
        debug!(method, "call: called");
        let url = format!("{}/{}", self.endpoint, method);
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.without_url()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.without_url()))?;
        let envelope: ApiResponse<T> = serde_json::from_str(&text)
            .map_err(|e| TransportError::InvalidResponse(format!("{method}: {e} (HTTP {status})")))?;

        if !envelope.ok {
            let code = envelope.error_code.unwrap_or(status);
            debug!(method, code, description = ?envelope.description, "call: API error");
            return Err(api_error(code, envelope.description, envelope.parameters));
        }

        envelope
            .result
            .ok_or_else(|| TransportError::InvalidResponse(format!("{method}: missing result")))
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_message(&self, chat: ChatId, text: &str, markup: Markup) -> Result<MessageRef, TransportError> {
        debug!(%chat, "send_message: called");
        let mut body = json!({
            "chat_id": chat.0,
            "text": text,
            "parse_mode": "HTML",
        });
        if let Some(markup) = markup_json(&markup) {
            body["reply_markup"] = markup;
        }
        let sent: TgMessage = self.call("sendMessage", body).await?;
        Ok(MessageRef::new(ChatId(sent.chat.id), sent.message_id))
    }

    async fn edit_message(&self, target: &MessageRef, text: &str, markup: Markup) -> Result<(), TransportError> {
        debug!(chat = %target.chat, message_id = target.message_id, "edit_message: called");
        let mut body = json!({
            "chat_id": target.chat.0,
            "message_id": target.message_id,
            "text": text,
            "parse_mode": "HTML",
        });
        match &markup {
            Markup::Inline(_) => {
                if let Some(markup) = markup_json(&markup) {
                    body["reply_markup"] = markup;
                }
            }
            Markup::Reply(_) => debug!("edit_message: reply keyboards cannot be edited in, dropping"),
            Markup::None => {}
        }
        // Edits answer with the message or `true`; either is fine
        let _: Value = self.call("editMessageText", body).await?;
        Ok(())
    }

    async fn send_typing(&self, chat: ChatId) -> Result<(), TransportError> {
        debug!(%chat, "send_typing: called");
        let _: Value = self
            .call("sendChatAction", json!({ "chat_id": chat.0, "action": "typing" }))
            .await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>, alert: bool) -> Result<(), TransportError> {
        debug!(callback_id, alert, "answer_callback: called");
        let mut body = json!({
            "callback_query_id": callback_id,
            "show_alert": alert,
        });
        if let Some(text) = text {
            body["text"] = json!(text);
        }
        let _: Value = self.call("answerCallbackQuery", body).await?;
        Ok(())
    }
}

#[async_trait]
impl UpdateSource for TelegramTransport {
    async fn next_events(&self) -> Result<Vec<Event>, TransportError> {
        let mut offset = self.offset.lock().await;
        debug!(offset = *offset, "next_events: polling");
        let updates: Vec<Update> = self
            .call(
                "getUpdates",
                json!({
                    "offset": *offset,
                    "timeout": self.poll_timeout_secs,
                    "allowed_updates": ["message", "callback_query"],
                }),
            )
            .await?;

        let mut events = Vec::with_capacity(updates.len());
        for update in updates {
            *offset = (*offset).max(update.update_id + 1);
            let id = update.update_id;
            match decode_update(update) {
                Some(event) => events.push(event),
                None => debug!(update_id = id, "next_events: ignoring update"),
            }
        }
        if events.len() > 1 {
            debug!(count = events.len(), "next_events: batch");
        }
        Ok(events)
    }
}
