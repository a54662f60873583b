//! Conversation — drives one user's registration dialogue.

use std::sync::Arc;

use crate::channels::OutgoingResponse;
use crate::registration::{FailureReason, Registrar, RegistrationOutcome, Role};

use super::command::{Answer, Command, Input};
use super::flow::{Flow, RoleInput};
use super::prompts;
use super::session::Session;
use super::step::Step;

/// Dialogue state for a single conversation.
///
/// Each input produces exactly one reply. A finished registration makes
/// exactly one call to the [`Registrar`].
pub struct Conversation {
    flow: Arc<dyn Flow>,
    registrar: Arc<dyn Registrar>,
    session: Option<Session>,
}

impl Conversation {
    pub fn new(flow: Arc<dyn Flow>, registrar: Arc<dyn Registrar>) -> Self {
        Self {
            flow,
            registrar,
            session: None,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Current step; `Idle` when no registration is in progress.
    pub fn step(&self) -> Step {
        self.session.as_ref().map_or(Step::Idle, |s| s.step)
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Handle one input from `user_id` and produce the reply.
    pub async fn handle(&mut self, user_id: &str, input: Input) -> OutgoingResponse {
        match input {
            Input::Command(Command::Start) => self.start(user_id),
            Input::Command(Command::Cancel) => self.cancel(user_id),
            Input::Command(Command::Help) => OutgoingResponse::text(prompts::HELP),
            Input::Command(Command::Unknown(name)) => {
                tracing::debug!(user_id, command = %name, "Unknown command");
                OutgoingResponse::text(prompts::HELP)
            }
            Input::Answer(answer) => self.answer(user_id, answer).await,
        }
    }

    fn start(&mut self, user_id: &str) -> OutgoingResponse {
        let entry = self.flow.entry_step();
        let session = Session::new(entry);
        let attempt_id = session.attempt_id;
        if let Some(previous) = self.session.replace(session) {
            tracing::info!(
                user_id,
                attempt_id = %previous.attempt_id,
                step = %previous.step,
                "Restarting registration, previous answers discarded"
            );
        }
        tracing::info!(user_id, %attempt_id, flow = %self.flow.variant(), "Registration started");
        self.flow.prompt(entry)
    }

    fn cancel(&mut self, user_id: &str) -> OutgoingResponse {
        match self.session.take() {
            Some(session) => {
                tracing::info!(
                    user_id,
                    attempt_id = %session.attempt_id,
                    step = %session.step,
                    "Registration cancelled"
                );
                self.flow.closing(OutgoingResponse::text(prompts::CANCELLED))
            }
            None => OutgoingResponse::text(prompts::NOTHING_TO_CANCEL),
        }
    }

    async fn answer(&mut self, user_id: &str, answer: Answer) -> OutgoingResponse {
        let flow = Arc::clone(&self.flow);
        let Some(session) = self.session.as_mut() else {
            return OutgoingResponse::text(prompts::NO_SESSION);
        };
        session.touch();
        let step = session.step;

        if step == Step::AwaitingRole {
            let role = match (flow.role_input(), &answer) {
                (RoleInput::Button, Answer::Button(data)) => Role::from_callback(data),
                (RoleInput::Text, Answer::Text(text)) => Role::from_label(text),
                _ => None,
            };
            let Some(role) = role else {
                tracing::debug!(user_id, "Answer does not name a role");
                return flow.role_reprompt();
            };
            session.record_role(role);
        } else {
            let text = match answer {
                Answer::Button(data) => {
                    tracing::debug!(user_id, %data, %step, "Button pressed outside role step");
                    return OutgoingResponse::text(prompts::STALE_BUTTON);
                }
                Answer::Text(text) => text,
            };
            if text.trim().is_empty() {
                tracing::debug!(user_id, field = step.field_name().unwrap_or("-"), "Empty answer");
                return OutgoingResponse::text(prompts::EMPTY_ANSWER);
            }
            if !session.record_text(step, text) {
                tracing::warn!(user_id, %step, "Session in a non-collecting step, resetting");
                self.session = None;
                return OutgoingResponse::text(prompts::NO_SESSION);
            }
        }

        match flow.next_step(step) {
            Some(Step::Completed) => self.complete(user_id).await,
            Some(next) => {
                session.step = next;
                flow.prompt(next)
            }
            None => {
                tracing::warn!(user_id, %step, "No step follows, resetting");
                self.session = None;
                OutgoingResponse::text(prompts::NO_SESSION)
            }
        }
    }

    async fn complete(&mut self, user_id: &str) -> OutgoingResponse {
        let Some(mut session) = self.session.take() else {
            return OutgoingResponse::text(prompts::NO_SESSION);
        };
        session.step = Step::Completed;

        let username = self.flow.username_for(user_id);
        let outcome = match session.to_request(username, self.flow.role_field()) {
            Ok(request) => self.registrar.submit(&request).await,
            Err(e) => {
                tracing::warn!(user_id, attempt_id = %session.attempt_id, "{e}");
                RegistrationOutcome::Failure(FailureReason::MissingInformation)
            }
        };

        tracing::info!(
            user_id,
            attempt_id = %session.attempt_id,
            outcome = outcome.label(),
            "Registration finished"
        );
        self.flow.closing(outcome.user_message())
    }
}
