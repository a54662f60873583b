//! Registration — request model, backend client, and outcome classification.
//!
//! One completed dialogue produces one [`RegistrationRequest`], which a
//! [`Registrar`] submits exactly once. The backend's answer is classified
//! into a [`RegistrationOutcome`] that knows how to phrase itself for the
//! user.

pub mod client;
pub mod model;
pub mod outcome;

pub use client::{DEFAULT_USER_AGENT, Registrar, RegistrationClient, RegistrationConfig};
pub use model::{RegistrationPayload, RegistrationRequest, Role, RoleField};
pub use outcome::{FailureReason, RegistrationOutcome, RegistrationSuccess};
