//! CLI channel — stdin/stdout REPL for local testing.
//!
//! Inline buttons are printed as `[Label]`; typing a label (or its
//! callback data) of the most recently shown buttons is delivered as a
//! button press, so the button-driven flow can be exercised without
//! Telegram.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channels::{
    Button, Channel, IncomingMessage, Keyboard, MessageStream, OutgoingResponse,
};
use crate::error::ChannelError;

const CLI_USER: &str = "local-user";

/// A simple CLI channel that reads from stdin and writes to stdout.
#[derive(Default)]
pub struct CliChannel {
    pending_buttons: Arc<Mutex<Vec<Button>>>,
}

impl CliChannel {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Turn a typed line into a message, consuming the pending buttons when the
/// line names one of them.
fn line_to_message(line: &str, pending: &Mutex<Vec<Button>>) -> IncomingMessage {
    let mut buttons = pending.lock().unwrap_or_else(|e| e.into_inner());
    let pressed = buttons
        .iter()
        .find(|b| b.label.eq_ignore_ascii_case(line) || b.data == line)
        .map(|b| b.data.clone());

    match pressed {
        Some(data) => {
            buttons.clear();
            IncomingMessage::callback("cli", CLI_USER, &data)
        }
        None => IncomingMessage::new("cli", CLI_USER, line),
    }
}

/// Render a keyboard below the reply text.
fn render_keyboard(keyboard: &Keyboard) -> Option<String> {
    match keyboard {
        Keyboard::Inline(rows) => Some(
            rows.iter()
                .map(|row| {
                    row.iter()
                        .map(|b| format!("[{}]", b.label))
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        Keyboard::Reply { rows, .. } => Some(
            rows.iter()
                .map(|row| row.join(" | "))
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        Keyboard::Remove => None,
    }
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let pending = Arc::clone(&self.pending_buttons);

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            eprint!("> ");
                            continue;
                        }
                        let msg = line_to_message(line, &pending);
                        if tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        _msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        println!("\n{}", response.content);
        if let Some(ref keyboard) = response.keyboard {
            if let Some(rendered) = render_keyboard(keyboard) {
                println!("{rendered}");
            }
            if let Keyboard::Inline(rows) = keyboard {
                let mut pending = self
                    .pending_buttons
                    .lock()
                    .unwrap_or_else(|e| e.into_inner());
                *pending = rows.iter().flatten().cloned().collect();
            }
        }
        println!();
        eprint!("> ");
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::MessageKind;

    fn role_buttons() -> Vec<Button> {
        vec![
            Button::new("Employer", "employer"),
            Button::new("Candidate", "candidate"),
        ]
    }

    #[test]
    fn typed_label_becomes_button_press() {
        let pending = Mutex::new(role_buttons());
        let msg = line_to_message("employer", &pending);
        assert_eq!(msg.kind, MessageKind::Callback);
        assert_eq!(msg.content, "employer");
        assert!(pending.lock().unwrap().is_empty());
    }

    #[test]
    fn label_match_is_case_insensitive() {
        let pending = Mutex::new(role_buttons());
        let msg = line_to_message("CANDIDATE", &pending);
        assert_eq!(msg.kind, MessageKind::Callback);
        assert_eq!(msg.content, "candidate");
    }

    #[test]
    fn other_text_stays_text() {
        let pending = Mutex::new(role_buttons());
        let msg = line_to_message("Jane", &pending);
        assert_eq!(msg.kind, MessageKind::Text);
        assert_eq!(msg.content, "Jane");
        assert_eq!(pending.lock().unwrap().len(), 2);
    }

    #[test]
    fn no_pending_buttons_means_text() {
        let pending = Mutex::new(Vec::new());
        assert_eq!(line_to_message("employer", &pending).kind, MessageKind::Text);
    }

    #[test]
    fn render_inline_and_reply_keyboards() {
        let inline = Keyboard::Inline(vec![role_buttons()]);
        assert_eq!(render_keyboard(&inline).unwrap(), "[Employer] [Candidate]");

        let reply = Keyboard::Reply {
            rows: vec![vec!["Employer".into()], vec!["Candidate".into()]],
            one_time: true,
        };
        assert_eq!(render_keyboard(&reply).unwrap(), "Employer\nCandidate");
        assert!(render_keyboard(&Keyboard::Remove).is_none());
    }

    #[tokio::test]
    async fn respond_records_inline_buttons() {
        let ch = CliChannel::new();
        let msg = IncomingMessage::new("cli", CLI_USER, "/start");
        let reply = OutgoingResponse::text("Choose:")
            .with_keyboard(Keyboard::Inline(vec![role_buttons()]));
        ch.respond(&msg, reply).await.unwrap();
        assert_eq!(ch.pending_buttons.lock().unwrap().len(), 2);
    }
}
