//! Registration dialogue.
//!
//! A [`Conversation`] holds at most one [`Session`] and walks it through
//! the steps of a [`Flow`]. Two flows exist:
//!
//! - [`KeyedStepFlow`]: role by inline button, then first name, last name,
//!   email, password.
//! - [`FiniteStateFlow`]: email, password, first name, last name, then role
//!   from a reply keyboard.
//!
//! Channel messages are turned into [`Input`] by [`InputParser`]; slash
//! commands are never recorded as answers.

pub mod command;
pub mod driver;
pub mod flow;
pub mod fsm;
pub mod keyed;
pub mod prompts;
pub mod session;
pub mod step;

pub use command::{Answer, Command, Input, InputParser};
pub use driver::Conversation;
pub use flow::{Flow, FlowVariant, RoleInput};
pub use fsm::FiniteStateFlow;
pub use keyed::KeyedStepFlow;
pub use session::Session;
pub use step::Step;
