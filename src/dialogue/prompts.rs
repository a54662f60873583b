//! Replies shared by every dialogue flow.
//!
//! Step prompts live with the flow that asks them (`keyed.rs`, `fsm.rs`).

use crate::channels::{Button, Keyboard};
use crate::registration::Role;

pub const NO_SESSION: &str = "Send /start to begin registration.";

pub const CANCELLED: &str = "Registration cancelled. Send /start to begin again.";

pub const NOTHING_TO_CANCEL: &str = "There is no registration in progress.";

pub const EMPTY_ANSWER: &str = "This field cannot be empty. Please try again.";

pub const STALE_BUTTON: &str = "That button is no longer active. Please type your answer.";

pub const HELP: &str = "I can create your job board account.\n\n\
    /start - begin (or restart) registration\n\
    /cancel - abandon the registration in progress\n\
    /help - show this message";

/// Employer/Candidate as inline buttons, side by side.
pub fn role_buttons() -> Keyboard {
    Keyboard::Inline(vec![
        Role::ALL
            .iter()
            .map(|r| Button::new(r.label(), r.callback_data()))
            .collect(),
    ])
}

/// Employer/Candidate as a one-time reply keyboard, one per row.
pub fn role_reply_keyboard() -> Keyboard {
    Keyboard::Reply {
        rows: Role::ALL.iter().map(|r| vec![r.label().to_string()]).collect(),
        one_time: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_buttons_carry_callback_data() {
        let Keyboard::Inline(rows) = role_buttons() else {
            panic!("expected inline keyboard");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], Button::new("Employer", "employer"));
        assert_eq!(rows[0][1], Button::new("Candidate", "candidate"));
    }

    #[test]
    fn reply_keyboard_has_one_role_per_row() {
        let Keyboard::Reply { rows, one_time } = role_reply_keyboard() else {
            panic!("expected reply keyboard");
        };
        assert!(one_time);
        assert_eq!(rows, vec![vec!["Employer".to_string()], vec!["Candidate".to_string()]]);
    }

    #[test]
    fn help_lists_commands() {
        for cmd in ["/start", "/cancel", "/help"] {
            assert!(HELP.contains(cmd));
        }
    }
}
