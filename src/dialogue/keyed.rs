//! Keyed-step flow — a `next_step` marker walked through a fixed sequence.
//!
//! The role is picked with an inline button, the rest is typed:
//! role → first name → last name → email → password.

use crate::channels::OutgoingResponse;
use crate::registration::RoleField;

use super::flow::{Flow, FlowVariant, RoleInput};
use super::prompts;
use super::step::Step;

/// Collection order.
const SEQUENCE: [Step; 5] = [
    Step::AwaitingRole,
    Step::AwaitingFirstName,
    Step::AwaitingLastName,
    Step::AwaitingEmail,
    Step::AwaitingPassword,
];

pub struct KeyedStepFlow;

impl Flow for KeyedStepFlow {
    fn variant(&self) -> FlowVariant {
        FlowVariant::Keyed
    }

    fn entry_step(&self) -> Step {
        SEQUENCE[0]
    }

    fn next_step(&self, step: Step) -> Option<Step> {
        let index = SEQUENCE.iter().position(|s| *s == step)?;
        Some(SEQUENCE.get(index + 1).copied().unwrap_or(Step::Completed))
    }

    fn prompt(&self, step: Step) -> OutgoingResponse {
        match step {
            Step::AwaitingRole => OutgoingResponse::text("Welcome! Choose your role:")
                .with_keyboard(prompts::role_buttons()),
            Step::AwaitingFirstName => OutgoingResponse::text("Send your first name:"),
            Step::AwaitingLastName => OutgoingResponse::text("Send your last name:"),
            Step::AwaitingEmail => OutgoingResponse::text("Send your email:"),
            Step::AwaitingPassword => OutgoingResponse::text("Choose a password:"),
            Step::Idle | Step::Completed => OutgoingResponse::text(prompts::NO_SESSION),
        }
    }

    fn role_input(&self) -> RoleInput {
        RoleInput::Button
    }

    fn role_reprompt(&self) -> OutgoingResponse {
        OutgoingResponse::text("Please choose your role using the buttons.")
            .with_keyboard(prompts::role_buttons())
    }

    fn username_for(&self, user_id: &str) -> String {
        format!("tg_{user_id}")
    }

    fn role_field(&self) -> RoleField {
        RoleField::Single
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::Keyboard;

    #[test]
    fn sequence_order() {
        let flow = KeyedStepFlow;
        assert_eq!(flow.entry_step(), Step::AwaitingRole);
        assert_eq!(flow.next_step(Step::AwaitingRole), Some(Step::AwaitingFirstName));
        assert_eq!(flow.next_step(Step::AwaitingFirstName), Some(Step::AwaitingLastName));
        assert_eq!(flow.next_step(Step::AwaitingLastName), Some(Step::AwaitingEmail));
        assert_eq!(flow.next_step(Step::AwaitingEmail), Some(Step::AwaitingPassword));
        assert_eq!(flow.next_step(Step::AwaitingPassword), Some(Step::Completed));
    }

    #[test]
    fn entry_prompt_offers_role_buttons() {
        let prompt = KeyedStepFlow.prompt(Step::AwaitingRole);
        assert_eq!(prompt.content, "Welcome! Choose your role:");
        assert!(matches!(prompt.keyboard, Some(Keyboard::Inline(_))));
    }

    #[test]
    fn username_is_prefixed_platform_id() {
        assert_eq!(KeyedStepFlow.username_for("123456"), "tg_123456");
    }

    #[test]
    fn sends_single_role_field() {
        assert_eq!(KeyedStepFlow.role_field(), RoleField::Single);
        assert_eq!(KeyedStepFlow.role_input(), RoleInput::Button);
    }
}
