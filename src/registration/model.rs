//! Registration request model.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Account type on the job board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Employer,
    Candidate,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Employer, Role::Candidate];

    /// Role identifier the backend expects.
    pub fn backend_id(&self) -> &'static str {
        match self {
            Self::Employer => "wp_job_board_pro_employer",
            Self::Candidate => "wp_job_board_pro_candidate",
        }
    }

    /// Human-facing label, also the reply-keyboard answer.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Employer => "Employer",
            Self::Candidate => "Candidate",
        }
    }

    /// Inline-button callback data.
    pub fn callback_data(&self) -> &'static str {
        match self {
            Self::Employer => "employer",
            Self::Candidate => "candidate",
        }
    }

    pub fn from_callback(data: &str) -> Option<Role> {
        Self::ALL.into_iter().find(|r| r.callback_data() == data)
    }

    /// Match a typed answer against the labels, ignoring case and
    /// surrounding whitespace.
    pub fn from_label(text: &str) -> Option<Role> {
        let text = text.trim();
        Self::ALL
            .into_iter()
            .find(|r| r.label().eq_ignore_ascii_case(text))
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// How the role is encoded in the request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoleField {
    /// `"role": "<id>"`
    #[default]
    Single,
    /// `"roles": ["<id>"]`
    List,
}

/// A complete registration, ready to send.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: SecretString,
    pub role: Role,
    pub role_field: RoleField,
}

/// JSON body of the registration POST.
#[derive(Debug, Serialize)]
pub struct RegistrationPayload<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<[&'static str; 1]>,
}

const REDACTED: &str = "********";

impl RegistrationRequest {
    /// Body sent to the backend. Exposes the password.
    pub fn payload(&self) -> RegistrationPayload<'_> {
        self.build_payload(self.password.expose_secret())
    }

    /// Same body with the password masked, for logging.
    pub fn redacted_payload(&self) -> RegistrationPayload<'_> {
        self.build_payload(REDACTED)
    }

    fn build_payload<'a>(&'a self, password: &'a str) -> RegistrationPayload<'a> {
        let id = self.role.backend_id();
        let (role, roles) = match self.role_field {
            RoleField::Single => (Some(id), None),
            RoleField::List => (None, Some([id])),
        };
        RegistrationPayload {
            username: &self.username,
            email: &self.email,
            first_name: &self.first_name,
            last_name: &self.last_name,
            password,
            role,
            roles,
        }
    }
}
