//! Flow — the shape of a registration dialogue.
//!
//! A flow decides which steps are asked, in what order, with which prompt,
//! and how the finished request is addressed to the backend. The
//! [`Conversation`](super::Conversation) driver does the rest.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::channels::OutgoingResponse;
use crate::registration::RoleField;

use super::fsm::FiniteStateFlow;
use super::keyed::KeyedStepFlow;
use super::step::Step;

/// Which dialogue variant drives conversations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowVariant {
    /// Role button first, then name, email, password.
    #[default]
    Keyed,
    /// Email, password, name, then role from a reply keyboard.
    Fsm,
}

impl FlowVariant {
    pub fn build(self) -> Arc<dyn Flow> {
        match self {
            Self::Keyed => Arc::new(KeyedStepFlow),
            Self::Fsm => Arc::new(FiniteStateFlow),
        }
    }
}

impl FromStr for FlowVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyed" | "keyed_step" | "keyed-step" => Ok(Self::Keyed),
            "fsm" | "finite_state" | "finite-state" => Ok(Self::Fsm),
            other => Err(format!("unknown flow {other:?}, expected \"keyed\" or \"fsm\"")),
        }
    }
}

impl std::fmt::Display for FlowVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Keyed => write!(f, "keyed"),
            Self::Fsm => write!(f, "fsm"),
        }
    }
}

/// How the role question is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleInput {
    /// Inline button press (callback).
    Button,
    /// Typed (or reply-keyboard) text.
    Text,
}

/// A registration dialogue definition.
pub trait Flow: Send + Sync {
    fn variant(&self) -> FlowVariant;

    /// First collection step, entered on `/start`.
    fn entry_step(&self) -> Step;

    /// Step that follows `step` once its field is recorded, or `None` when
    /// `step` is not a collection step of this flow.
    fn next_step(&self, step: Step) -> Option<Step>;

    /// Prompt sent on entering `step`.
    fn prompt(&self, step: Step) -> OutgoingResponse;

    fn role_input(&self) -> RoleInput;

    /// Reply to an answer that does not name a role.
    fn role_reprompt(&self) -> OutgoingResponse;

    /// Backend username for a platform user id.
    fn username_for(&self, user_id: &str) -> String;

    fn role_field(&self) -> RoleField;

    /// Adjust a reply that ends the dialogue (completion or cancellation).
    fn closing(&self, response: OutgoingResponse) -> OutgoingResponse {
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_parses_aliases() {
        assert_eq!("keyed".parse::<FlowVariant>(), Ok(FlowVariant::Keyed));
        assert_eq!("Keyed-Step".parse::<FlowVariant>(), Ok(FlowVariant::Keyed));
        assert_eq!(" fsm ".parse::<FlowVariant>(), Ok(FlowVariant::Fsm));
        assert_eq!("finite_state".parse::<FlowVariant>(), Ok(FlowVariant::Fsm));
        assert!("wizard".parse::<FlowVariant>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for variant in [FlowVariant::Keyed, FlowVariant::Fsm] {
            assert_eq!(variant.to_string().parse::<FlowVariant>(), Ok(variant));
        }
    }

    #[test]
    fn build_returns_matching_flow() {
        assert_eq!(FlowVariant::Keyed.build().variant(), FlowVariant::Keyed);
        assert_eq!(FlowVariant::Fsm.build().variant(), FlowVariant::Fsm);
    }

    /// Walking `next_step` from the entry step must visit every collection
    /// step exactly once and end at `Completed`.
    #[test]
    fn every_flow_visits_each_field_once() {
        for variant in [FlowVariant::Keyed, FlowVariant::Fsm] {
            let flow = variant.build();
            let mut seen = Vec::new();
            let mut step = flow.entry_step();
            while step != Step::Completed {
                assert!(step.is_collecting(), "{variant}: {step} is not a collection step");
                assert!(!seen.contains(&step), "{variant}: {step} visited twice");
                seen.push(step);
                step = flow.next_step(step).expect("flow ended before Completed");
            }
            assert_eq!(seen.len(), 5, "{variant}");
            assert_eq!(flow.next_step(Step::Idle), None);
            assert_eq!(flow.next_step(Step::Completed), None);
        }
    }
}
