//! Dialogue steps — where a conversation is in the registration sequence.

use serde::{Deserialize, Serialize};

/// The steps of a registration dialogue.
///
/// Which collection steps are used, and in what order, is decided by the
/// [`Flow`](super::Flow); every flow starts at `Idle` and ends at
/// `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// No registration in progress.
    #[default]
    Idle,
    AwaitingRole,
    AwaitingFirstName,
    AwaitingLastName,
    AwaitingEmail,
    AwaitingPassword,
    /// All fields collected; the request is being submitted.
    Completed,
}

impl Step {
    /// Whether the dialogue is waiting for the user to supply a field.
    pub fn is_collecting(&self) -> bool {
        !matches!(self, Self::Idle | Self::Completed)
    }

    /// Name of the field collected at this step.
    pub fn field_name(&self) -> Option<&'static str> {
        match self {
            Self::AwaitingRole => Some("role"),
            Self::AwaitingFirstName => Some("first_name"),
            Self::AwaitingLastName => Some("last_name"),
            Self::AwaitingEmail => Some("email"),
            Self::AwaitingPassword => Some("password"),
            Self::Idle | Self::Completed => None,
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::AwaitingRole => "awaiting_role",
            Self::AwaitingFirstName => "awaiting_first_name",
            Self::AwaitingLastName => "awaiting_last_name",
            Self::AwaitingEmail => "awaiting_email",
            Self::AwaitingPassword => "awaiting_password",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Step; 7] = [
        Step::Idle,
        Step::AwaitingRole,
        Step::AwaitingFirstName,
        Step::AwaitingLastName,
        Step::AwaitingEmail,
        Step::AwaitingPassword,
        Step::Completed,
    ];

    #[test]
    fn collecting_steps_have_field_names() {
        for step in ALL {
            assert_eq!(step.is_collecting(), step.field_name().is_some(), "{step}");
        }
    }

    #[test]
    fn display_matches_serde() {
        for step in ALL {
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(format!("\"{step}\""), json, "Display and serde should match for {step:?}");
        }
    }

    #[test]
    fn default_is_idle() {
        assert_eq!(Step::default(), Step::Idle);
    }
}
