//! Input parsing — turns a channel message into dialogue input.

use crate::channels::{IncomingMessage, MessageKind};

/// A slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Cancel,
    Help,
    /// Any other `/word`; never captured as a field value.
    Unknown(String),
}

/// An answer to the current prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// Free text, kept verbatim.
    Text(String),
    /// Inline-button callback data.
    Button(String),
}

/// Parsed dialogue input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(Command),
    Answer(Answer),
}

/// Parses channel messages into [`Input`].
pub struct InputParser;

impl InputParser {
    pub fn parse(message: &IncomingMessage) -> Input {
        match message.kind {
            MessageKind::Callback => Input::Answer(Answer::Button(message.content.clone())),
            MessageKind::Text => Self::parse_text(&message.content),
        }
    }

    /// Parse typed text. Commands are matched case-insensitively and may
    /// carry a `@botname` suffix or trailing arguments (`/start ref42`).
    pub fn parse_text(content: &str) -> Input {
        match parse_command(content.trim()) {
            Some(command) => Input::Command(command),
            None => Input::Answer(Answer::Text(content.to_string())),
        }
    }
}

fn parse_command(trimmed: &str) -> Option<Command> {
    let rest = trimmed.strip_prefix('/')?;
    let word = rest.split_whitespace().next().unwrap_or_default();
    let name = word.split('@').next().unwrap_or_default().to_lowercase();

    Some(match name.as_str() {
        "start" => Command::Start,
        "cancel" => Command::Cancel,
        "help" => Command::Help,
        _ => Command::Unknown(word.to_string()),
    })
}
