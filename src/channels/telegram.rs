//! Telegram channel — long-polls the Bot API for updates.
//!
//! Talks to the Bot API directly over reqwest: `getUpdates` for inbound
//! text messages and inline-button presses, `sendMessage` with optional
//! keyboard markup for replies, `answerCallbackQuery` to acknowledge
//! button presses.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::channels::{
    Channel, IncomingMessage, Keyboard, MessageStream, OutgoingResponse,
};
use crate::error::ChannelError;

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Long-poll timeout passed to getUpdates, in seconds.
const POLL_TIMEOUT_SECS: u64 = 30;

/// Telegram channel connected to the Bot API via long-polling.
pub struct TelegramChannel {
    bot_token: SecretString,
    allowed_users: Vec<String>,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: SecretString, allowed_users: Vec<String>) -> Self {
        Self {
            bot_token,
            allowed_users,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        api_url(&self.bot_token, method)
    }

    /// Send a reply, splitting it to fit Telegram's 4096 char limit.
    /// The keyboard, if any, is attached to the last chunk.
    async fn send_message(
        &self,
        chat_id: &str,
        response: &OutgoingResponse,
    ) -> Result<(), ChannelError> {
        let chunks = split_message(&response.content, TELEGRAM_MAX_MESSAGE_LENGTH);
        let last = chunks.len().saturating_sub(1);

        for (i, chunk) in chunks.iter().enumerate() {
            let keyboard = if i == last {
                response.keyboard.as_ref()
            } else {
                None
            };
            self.send_message_chunk(chat_id, chunk, response.markdown, keyboard)
                .await?;
        }
        Ok(())
    }

    /// Send a single message chunk (≤4096 chars).
    ///
    /// Markdown replies that Telegram refuses to parse are resent as plain
    /// text so the user still gets the message.
    async fn send_message_chunk(
        &self,
        chat_id: &str,
        text: &str,
        markdown: bool,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), ChannelError> {
        let body = send_message_body(chat_id, text, markdown, keyboard);
        let resp = self.post_send_message(&body).await?;

        if resp.status().is_success() {
            return Ok(());
        }

        let status = resp.status();
        let err_body = resp.text().await.unwrap_or_default();
        if !markdown {
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!("sendMessage returned {status}: {err_body}"),
            });
        }

        tracing::warn!(
            status = ?status,
            "Telegram sendMessage with Markdown failed; retrying without parse_mode"
        );

        let plain_body = send_message_body(chat_id, text, false, keyboard);
        let plain_resp = self.post_send_message(&plain_body).await?;

        if !plain_resp.status().is_success() {
            let plain_err = plain_resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!(
                    "sendMessage failed (markdown: {}, plain: {})",
                    status, plain_err
                ),
            });
        }

        Ok(())
    }

    async fn post_send_message(&self, body: &Value) -> Result<reqwest::Response, ChannelError> {
        self.client
            .post(self.api_url("sendMessage"))
            .json(body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })
    }
}

// ── Channel trait implementation ────────────────────────────────────

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let bot_token = self.bot_token.clone();
        let allowed_users = self.allowed_users.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram channel listening for messages...");

            loop {
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": POLL_TIMEOUT_SECS,
                    "allowed_updates": ["message", "callback_query"]
                });

                let resp = match client
                    .post(api_url(&bot_token, "getUpdates"))
                    .json(&body)
                    .send()
                    .await
                {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let data: Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let Some(results) = data.get("result").and_then(Value::as_array) else {
                    // ok=false, e.g. a second poller on the same token (409)
                    let description = poll_error_description(&data);
                    tracing::warn!(description, "Telegram getUpdates returned no result");
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    continue;
                };

                for update in results {
                    // Advance offset past this update
                    if let Some(uid) = update.get("update_id").and_then(Value::as_i64) {
                        offset = uid + 1;
                    }

                    let Some(parsed) = parse_update(update) else {
                        continue;
                    };

                    // Acknowledge button presses so the client stops its spinner,
                    // even when the sender is then dropped by the allowlist.
                    if let Some(ref callback_id) = parsed.callback_id {
                        let ack = client
                            .post(api_url(&bot_token, "answerCallbackQuery"))
                            .json(&serde_json::json!({ "callback_query_id": callback_id }))
                            .send()
                            .await;
                        if let Err(e) = ack {
                            tracing::warn!("Telegram answerCallbackQuery failed: {e}");
                        }
                    }

                    let identities = [parsed.username.as_str(), parsed.user_id.as_str()];
                    if !check_user_allowed(&allowed_users, identities) {
                        tracing::warn!(
                            "Telegram: ignoring update from unauthorized user: \
                             username={}, user_id={}",
                            parsed.username,
                            parsed.user_id
                        );
                        continue;
                    }

                    if tx.send(parsed.into_incoming()).is_err() {
                        tracing::info!("Telegram listener channel closed");
                        return;
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        let chat_id = msg
            .metadata
            .get("chat_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: "No chat_id in message metadata".into(),
            })?;

        self.send_message(chat_id, &response).await
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: format!("getMe returned {}", resp.status()),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram channel shutting down");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn api_url(bot_token: &SecretString, method: &str) -> String {
    format!(
        "https://api.telegram.org/bot{}/{method}",
        bot_token.expose_secret()
    )
}

/// The parts of a Telegram update the bot cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ParsedUpdate {
    user_id: String,
    username: String,
    first_name: Option<String>,
    chat_id: String,
    /// Message text, or callback data for button presses.
    content: String,
    /// Set for `callback_query` updates.
    callback_id: Option<String>,
}

impl ParsedUpdate {
    fn into_incoming(self) -> IncomingMessage {
        let mut incoming = match self.callback_id {
            Some(_) => IncomingMessage::callback("telegram", &self.user_id, &self.content),
            None => IncomingMessage::new("telegram", &self.user_id, &self.content),
        };
        incoming = incoming.with_metadata(serde_json::json!({
            "chat_id": self.chat_id,
            "username": self.username,
        }));
        let display = self.first_name.as_deref().unwrap_or(&self.username);
        incoming.with_user_name(display)
    }
}

/// Extract a text message or a button press from a raw update.
/// Anything else (edits, stickers, updates without a sender) yields `None`.
fn parse_update(update: &Value) -> Option<ParsedUpdate> {
    if let Some(query) = update.get("callback_query") {
        let from = query.get("from")?;
        let user_id = from.get("id").and_then(Value::as_i64)?.to_string();
        let data = query.get("data").and_then(Value::as_str)?;
        let callback_id = query.get("id").and_then(Value::as_str)?;
        // Private chats share the user's id; fall back to it when the
        // originating message is too old to be included.
        let chat_id = query
            .get("message")
            .and_then(|m| m.get("chat"))
            .and_then(|c| c.get("id"))
            .and_then(Value::as_i64)
            .map(|id| id.to_string())
            .unwrap_or_else(|| user_id.clone());

        return Some(ParsedUpdate {
            username: sender_username(from),
            first_name: sender_first_name(from),
            user_id,
            chat_id,
            content: data.to_string(),
            callback_id: Some(callback_id.to_string()),
        });
    }

    let message = update.get("message")?;
    let text = message.get("text").and_then(Value::as_str)?;
    let from = message.get("from")?;
    let user_id = from.get("id").and_then(Value::as_i64)?.to_string();
    let chat_id = message
        .get("chat")
        .and_then(|c| c.get("id"))
        .and_then(Value::as_i64)
        .map(|id| id.to_string())?;

    Some(ParsedUpdate {
        username: sender_username(from),
        first_name: sender_first_name(from),
        user_id,
        chat_id,
        content: text.to_string(),
        callback_id: None,
    })
}

/// `description` of an `ok: false` Bot API reply, or `-`.
fn poll_error_description(data: &Value) -> &str {
    data.get("description")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("-")
}

fn sender_username(from: &Value) -> String {
    from.get("username")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string()
}

fn sender_first_name(from: &Value) -> Option<String> {
    from.get("first_name")
        .and_then(Value::as_str)
        .map(String::from)
}

/// Build a sendMessage request body.
fn send_message_body(
    chat_id: &str,
    text: &str,
    markdown: bool,
    keyboard: Option<&Keyboard>,
) -> Value {
    let mut body = serde_json::json!({
        "chat_id": chat_id,
        "text": text,
    });
    if markdown {
        body["parse_mode"] = Value::String("Markdown".into());
    }
    if let Some(keyboard) = keyboard {
        body["reply_markup"] = reply_markup(keyboard);
    }
    body
}

/// Translate a keyboard into Bot API `reply_markup` JSON.
fn reply_markup(keyboard: &Keyboard) -> Value {
    match keyboard {
        Keyboard::Inline(rows) => {
            let rows: Vec<Vec<Value>> = rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|b| serde_json::json!({ "text": b.label, "callback_data": b.data }))
                        .collect()
                })
                .collect();
            serde_json::json!({ "inline_keyboard": rows })
        }
        Keyboard::Reply { rows, one_time } => {
            let rows: Vec<Vec<Value>> = rows
                .iter()
                .map(|row| row.iter().map(|t| serde_json::json!({ "text": t })).collect())
                .collect();
            serde_json::json!({
                "keyboard": rows,
                "one_time_keyboard": one_time,
                "resize_keyboard": true,
            })
        }
        Keyboard::Remove => serde_json::json!({ "remove_keyboard": true }),
    }
}

/// Check if any identity in the iterator matches the allowed users list.
fn check_user_allowed<'a>(
    allowed_users: &[String],
    identities: impl IntoIterator<Item = &'a str>,
) -> bool {
    let ids: Vec<&str> = identities.into_iter().collect();
    allowed_users
        .iter()
        .any(|u| u == "*" || ids.contains(&u.as_str()))
}

/// Split a message into chunks that fit Telegram's character limit.
/// Tries to split on newlines, then spaces, then hard-cuts.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        // Largest char boundary within the limit
        let mut limit = max_len;
        while !remaining.is_char_boundary(limit) {
            limit -= 1;
        }

        let chunk = &remaining[..limit];
        let split_at = chunk
            .rfind('\n')
            .or_else(|| chunk.rfind(' '))
            .unwrap_or(limit);

        // Don't split at position 0 (infinite loop guard)
        let split_at = if split_at == 0 { limit } else { split_at };

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{Button, MessageKind};

    fn channel(users: &[&str]) -> TelegramChannel {
        TelegramChannel::new(
            "123:ABC".into(),
            users.iter().map(|u| u.to_string()).collect(),
        )
    }

    fn allowed(users: &[&str], identities: &[&str]) -> bool {
        let users: Vec<String> = users.iter().map(|u| u.to_string()).collect();
        check_user_allowed(&users, identities.iter().copied())
    }

    // ── Basic channel tests ─────────────────────────────────────────

    #[test]
    fn telegram_channel_name() {
        assert_eq!(channel(&["*"]).name(), "telegram");
    }

    #[test]
    fn telegram_api_url() {
        assert_eq!(
            channel(&[]).api_url("getMe"),
            "https://api.telegram.org/bot123:ABC/getMe"
        );
    }

    // ── User allowlist tests ────────────────────────────────────────

    #[test]
    fn telegram_user_allowed_wildcard() {
        assert!(allowed(&["*"], &["anyone"]));
    }

    #[test]
    fn telegram_user_allowed_specific() {
        assert!(allowed(&["alice", "bob"], &["alice"]));
        assert!(!allowed(&["alice", "bob"], &["eve"]));
    }

    #[test]
    fn telegram_user_denied_empty() {
        assert!(!allowed(&[], &["anyone"]));
    }

    #[test]
    fn telegram_user_exact_match_not_substring() {
        assert!(!allowed(&["alice"], &["alice_bot"]));
        assert!(!allowed(&["alice"], &["malice"]));
    }

    #[test]
    fn telegram_user_allowed_by_numeric_id_identity() {
        assert!(allowed(&["123456789"], &["unknown", "123456789"]));
        assert!(!allowed(&["123456789"], &["unknown", "987654321"]));
    }

    // ── Update parsing ──────────────────────────────────────────────

    #[test]
    fn parse_text_message_update() {
        let update = serde_json::json!({
            "update_id": 10,
            "message": {
                "message_id": 1,
                "from": { "id": 555, "username": "jdoe", "first_name": "Jane" },
                "chat": { "id": 555 },
                "text": "/start"
            }
        });

        let parsed = parse_update(&update).unwrap();
        assert_eq!(parsed.user_id, "555");
        assert_eq!(parsed.username, "jdoe");
        assert_eq!(parsed.chat_id, "555");
        assert_eq!(parsed.content, "/start");
        assert!(parsed.callback_id.is_none());

        let incoming = parsed.into_incoming();
        assert_eq!(incoming.kind, MessageKind::Text);
        assert_eq!(incoming.user_name.as_deref(), Some("Jane"));
        assert_eq!(incoming.metadata["chat_id"], "555");
    }

    #[test]
    fn parse_callback_query_update() {
        let update = serde_json::json!({
            "update_id": 11,
            "callback_query": {
                "id": "cbq-1",
                "from": { "id": 555, "first_name": "Jane" },
                "message": { "message_id": 2, "chat": { "id": -100 } },
                "data": "employer"
            }
        });

        let parsed = parse_update(&update).unwrap();
        assert_eq!(parsed.callback_id.as_deref(), Some("cbq-1"));
        assert_eq!(parsed.chat_id, "-100");
        assert_eq!(parsed.username, "unknown");

        let incoming = parsed.into_incoming();
        assert_eq!(incoming.kind, MessageKind::Callback);
        assert_eq!(incoming.content, "employer");
    }

    #[test]
    fn parse_callback_without_message_uses_user_id_as_chat() {
        let update = serde_json::json!({
            "callback_query": {
                "id": "cbq-2",
                "from": { "id": 777 },
                "data": "candidate"
            }
        });
        assert_eq!(parse_update(&update).unwrap().chat_id, "777");
    }

    #[test]
    fn parse_ignores_non_text_messages() {
        let sticker = serde_json::json!({
            "message": {
                "from": { "id": 1 },
                "chat": { "id": 1 },
                "sticker": { "file_id": "x" }
            }
        });
        assert!(parse_update(&sticker).is_none());

        let edited = serde_json::json!({ "edited_message": { "text": "hi" } });
        assert!(parse_update(&edited).is_none());
    }

    #[test]
    fn poll_error_description_reads_ok_false_reply() {
        let conflict = serde_json::json!({
            "ok": false,
            "error_code": 409,
            "description": "Conflict: terminated by other getUpdates request"
        });
        assert_eq!(
            poll_error_description(&conflict),
            "Conflict: terminated by other getUpdates request"
        );
        assert_eq!(poll_error_description(&serde_json::json!({ "ok": false })), "-");
    }

    // ── Request bodies ──────────────────────────────────────────────

    #[test]
    fn send_message_body_plain_has_no_parse_mode() {
        let body = send_message_body("42", "hello", false, None);
        assert_eq!(body["chat_id"], "42");
        assert_eq!(body["text"], "hello");
        assert!(body.get("parse_mode").is_none());
        assert!(body.get("reply_markup").is_none());
    }

    #[test]
    fn send_message_body_markdown_sets_parse_mode() {
        let body = send_message_body("42", "[Login](https://x/y)", true, None);
        assert_eq!(body["parse_mode"], "Markdown");
    }

    #[test]
    fn inline_keyboard_markup() {
        let keyboard = Keyboard::Inline(vec![vec![
            Button::new("Employer", "employer"),
            Button::new("Candidate", "candidate"),
        ]]);
        let markup = reply_markup(&keyboard);
        assert_eq!(markup["inline_keyboard"][0][0]["text"], "Employer");
        assert_eq!(markup["inline_keyboard"][0][1]["callback_data"], "candidate");
    }

    #[test]
    fn reply_keyboard_markup_is_one_time() {
        let keyboard = Keyboard::Reply {
            rows: vec![vec!["Employer".into()], vec!["Candidate".into()]],
            one_time: true,
        };
        let markup = reply_markup(&keyboard);
        assert_eq!(markup["keyboard"][1][0]["text"], "Candidate");
        assert_eq!(markup["one_time_keyboard"], true);
    }

    #[test]
    fn remove_keyboard_markup() {
        assert_eq!(
            reply_markup(&Keyboard::Remove),
            serde_json::json!({ "remove_keyboard": true })
        );
    }

    // ── Respond extracts chat_id from metadata ──────────────────────

    #[tokio::test]
    async fn respond_without_chat_id_fails() {
        let ch = channel(&["*"]);
        let msg = IncomingMessage::new("telegram", "user123", "hello");
        let err = ch
            .respond(&msg, OutgoingResponse::text("hi"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("chat_id"));
    }

    // ── Message splitting tests ─────────────────────────────────────

    #[test]
    fn split_message_short() {
        assert_eq!(split_message("Hello", 4096), vec!["Hello"]);
    }

    #[test]
    fn split_message_exact_limit() {
        let msg = "a".repeat(4096);
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 4096);
    }

    #[test]
    fn split_message_over_limit_on_newline() {
        let msg = format!("{}\n{}", "a".repeat(2000), "b".repeat(3000));
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks, vec!["a".repeat(2000), "b".repeat(3000)]);
    }

    #[test]
    fn split_message_no_good_split_point() {
        let msg = "a".repeat(5000);
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 4096);
        assert_eq!(chunks[1].len(), 904);
    }

    #[test]
    fn split_message_respects_char_boundaries() {
        // 'é' is two bytes; an odd limit would land mid-character
        let msg = "é".repeat(10);
        let chunks = split_message(&msg, 5);
        assert!(chunks.iter().all(|c| c.len() <= 5));
        assert_eq!(chunks.concat(), msg);
    }
}
