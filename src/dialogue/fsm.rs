//! Finite-state flow — named states with an explicit transition function.
//!
//! email → password → first name → last name → role. The role is answered
//! from a one-time reply keyboard, so it arrives as text.

use crate::channels::{Keyboard, OutgoingResponse};
use crate::registration::RoleField;

use super::flow::{Flow, FlowVariant, RoleInput};
use super::prompts;
use super::step::Step;

pub struct FiniteStateFlow;

impl Flow for FiniteStateFlow {
    fn variant(&self) -> FlowVariant {
        FlowVariant::Fsm
    }

    fn entry_step(&self) -> Step {
        Step::AwaitingEmail
    }

    fn next_step(&self, step: Step) -> Option<Step> {
        match step {
            Step::AwaitingEmail => Some(Step::AwaitingPassword),
            Step::AwaitingPassword => Some(Step::AwaitingFirstName),
            Step::AwaitingFirstName => Some(Step::AwaitingLastName),
            Step::AwaitingLastName => Some(Step::AwaitingRole),
            Step::AwaitingRole => Some(Step::Completed),
            Step::Idle | Step::Completed => None,
        }
    }

    fn prompt(&self, step: Step) -> OutgoingResponse {
        match step {
            Step::AwaitingEmail => OutgoingResponse::text(
                "Welcome! Let's create a new user. Please enter your email address:",
            ),
            Step::AwaitingPassword => OutgoingResponse::text("Next, please enter a password:"),
            Step::AwaitingFirstName => {
                OutgoingResponse::text("Almost done! Please enter your first name:")
            }
            Step::AwaitingLastName => {
                OutgoingResponse::text("Finally, please enter your last name:")
            }
            Step::AwaitingRole => OutgoingResponse::text("Please choose your role:")
                .with_keyboard(prompts::role_reply_keyboard()),
            Step::Idle | Step::Completed => OutgoingResponse::text(prompts::NO_SESSION),
        }
    }

    fn role_input(&self) -> RoleInput {
        RoleInput::Text
    }

    fn role_reprompt(&self) -> OutgoingResponse {
        OutgoingResponse::text("Please choose Employer or Candidate.")
            .with_keyboard(prompts::role_reply_keyboard())
    }

    fn username_for(&self, user_id: &str) -> String {
        user_id.to_string()
    }

    fn role_field(&self) -> RoleField {
        RoleField::List
    }

    fn closing(&self, response: OutgoingResponse) -> OutgoingResponse {
        // The role keyboard may still be showing after /cancel
        response.with_keyboard(Keyboard::Remove)
    }
}
