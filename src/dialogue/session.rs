//! Per-conversation registration session.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

use crate::error::DialogueError;
use crate::registration::{RegistrationRequest, Role, RoleField};

use super::step::Step;

/// Fields collected so far in one registration attempt.
///
/// Owned by exactly one conversation; created on `/start` and dropped on
/// completion, cancellation or idle expiry.
#[derive(Debug, Clone)]
pub struct Session {
    /// Correlates log lines of one attempt.
    pub attempt_id: Uuid,
    pub step: Step,
    pub role: Option<Role>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<SecretString>,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    /// Fresh session positioned at `step`.
    pub fn new(step: Step) -> Self {
        let now = Utc::now();
        Self {
            attempt_id: Uuid::new_v4(),
            step,
            role: None,
            first_name: None,
            last_name: None,
            email: None,
            password: None,
            started_at: now,
            last_activity: now,
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Time since the last answer was accepted.
    pub fn idle_for(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.last_activity
    }

    /// Time since `/start`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.started_at
    }

    pub fn record_role(&mut self, role: Role) {
        self.role = Some(role);
    }

    /// Store a typed answer for `step` verbatim. Returns `false` when `step`
    /// does not collect free text.
    pub fn record_text(&mut self, step: Step, value: String) -> bool {
        match step {
            Step::AwaitingFirstName => self.first_name = Some(value),
            Step::AwaitingLastName => self.last_name = Some(value),
            Step::AwaitingEmail => self.email = Some(value),
            Step::AwaitingPassword => self.password = Some(SecretString::from(value)),
            Step::Idle | Step::AwaitingRole | Step::Completed => return false,
        }
        true
    }

    /// Names of required fields that are absent or empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        let mut missing = Vec::new();
        if self.role.is_none() {
            missing.push("role");
        }
        if !present(&self.first_name) {
            missing.push("first_name");
        }
        if !present(&self.last_name) {
            missing.push("last_name");
        }
        if !present(&self.email) {
            missing.push("email");
        }
        if !self
            .password
            .as_ref()
            .is_some_and(|p| !p.expose_secret().is_empty())
        {
            missing.push("password");
        }
        missing
    }

    /// Build the registration request, refusing if any field is missing.
    pub fn to_request(
        &self,
        username: String,
        role_field: RoleField,
    ) -> Result<RegistrationRequest, DialogueError> {
        let missing = self.missing_fields();
        let (Some(role), Some(first_name), Some(last_name), Some(email), Some(password)) = (
            self.role,
            &self.first_name,
            &self.last_name,
            &self.email,
            &self.password,
        ) else {
            return Err(DialogueError::IncompleteInput { missing });
        };
        if !missing.is_empty() {
            return Err(DialogueError::IncompleteInput { missing });
        }

        Ok(RegistrationRequest {
            username,
            email: email.clone(),
            first_name: first_name.clone(),
            last_name: last_name.clone(),
            password: password.clone(),
            role,
            role_field,
        })
    }
}
