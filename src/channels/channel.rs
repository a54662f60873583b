//! Channel trait and the message types that flow through it.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ChannelError;

/// Stream of inbound messages produced by a started channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// What kind of user action produced an incoming message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// A typed text message (commands included).
    Text,
    /// An inline-button press; `content` holds the button's callback data.
    Callback,
}

/// A message received from a channel.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Unique id assigned on receipt.
    pub id: Uuid,
    /// Name of the channel that produced the message.
    pub channel: String,
    /// Platform identity of the sender (numeric id on Telegram).
    pub user_id: String,
    /// Display name, if the platform provides one.
    pub user_name: Option<String>,
    /// Message text, or callback data for button presses.
    pub content: String,
    pub kind: MessageKind,
    pub received_at: DateTime<Utc>,
    /// Channel-specific routing data (e.g. Telegram `chat_id`).
    pub metadata: serde_json::Value,
}

impl IncomingMessage {
    /// Create a text message.
    pub fn new(channel: &str, user_id: &str, content: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.to_string(),
            user_id: user_id.to_string(),
            user_name: None,
            content: content.to_string(),
            kind: MessageKind::Text,
            received_at: Utc::now(),
            metadata: serde_json::Value::Null,
        }
    }

    /// Create a button-press message carrying `data`.
    pub fn callback(channel: &str, user_id: &str, data: &str) -> Self {
        Self {
            kind: MessageKind::Callback,
            ..Self::new(channel, user_id, data)
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_user_name(mut self, name: &str) -> Self {
        self.user_name = Some(name.to_string());
        self
    }

    /// Key identifying the conversation this message belongs to.
    ///
    /// The same platform user on two different channels is two conversations.
    pub fn conversation_key(&self) -> String {
        format!("{}:{}", self.channel, self.user_id)
    }
}

/// An inline button attached to a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    /// Data delivered back as a [`MessageKind::Callback`] message when pressed.
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// Keyboard markup attached to a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    /// Buttons rendered under the message; presses arrive as callbacks.
    Inline(Vec<Vec<Button>>),
    /// Suggested answers replacing the user's keyboard; choices arrive as text.
    Reply { rows: Vec<Vec<String>>, one_time: bool },
    /// Remove a previously shown reply keyboard.
    Remove,
}

/// A reply to send back to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingResponse {
    pub content: String,
    /// Render `content` as Telegram-flavoured Markdown.
    pub markdown: bool,
    pub keyboard: Option<Keyboard>,
}

impl OutgoingResponse {
    /// Plain text reply.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            markdown: false,
            keyboard: None,
        }
    }

    /// Markdown reply.
    pub fn markdown(content: impl Into<String>) -> Self {
        Self {
            markdown: true,
            ..Self::text(content)
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

/// A bidirectional chat transport.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Stable channel name, used to route replies.
    fn name(&self) -> &str;

    /// Start receiving messages.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Send a reply to the chat `msg` came from.
    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError>;

    /// Verify the transport is reachable and credentials are valid.
    async fn health_check(&self) -> Result<(), ChannelError>;

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_message_keeps_data_as_content() {
        let msg = IncomingMessage::callback("telegram", "42", "employer");
        assert_eq!(msg.kind, MessageKind::Callback);
        assert_eq!(msg.content, "employer");
        assert_eq!(msg.user_id, "42");
    }

    #[test]
    fn conversation_key_includes_channel() {
        let tg = IncomingMessage::new("telegram", "42", "hi");
        let cli = IncomingMessage::new("cli", "42", "hi");
        assert_eq!(tg.conversation_key(), "telegram:42");
        assert_ne!(tg.conversation_key(), cli.conversation_key());
    }

    #[test]
    fn markdown_response_sets_flag() {
        let plain = OutgoingResponse::text("hello");
        let md = OutgoingResponse::markdown("[Login](https://x/y)");
        assert!(!plain.markdown);
        assert!(md.markdown);
        assert!(md.keyboard.is_none());
    }
}
