//! Classification of registration API responses.

use reqwest::StatusCode;
use serde_json::Value;

use crate::channels::OutgoingResponse;

/// Error string the backend returns for a duplicate username or email.
pub const USER_EXISTS_ERROR: &str = "User already exists";
/// Error string the backend returns when a body field is absent.
pub const MISSING_PARAMETERS_ERROR: &str = "Missing parameters";

/// Fields reported by the backend after a successful registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationSuccess {
    pub login_url: Option<String>,
    /// The account needs manual admin approval before it can be used.
    pub approval_pending: bool,
    pub meta_key: Option<String>,
    pub meta_value: Option<String>,
    pub user_id: Option<String>,
    /// The backend answered 200 but the body was not JSON.
    pub degraded: bool,
}

/// Why a registration did not go through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Username or email already registered.
    UserExists,
    /// The backend reported missing request fields.
    MissingParameters,
    /// The session was incomplete; nothing was sent.
    MissingInformation,
    /// The request never got an HTTP response.
    NetworkError(String),
    /// Any other backend error, with its message when one was readable.
    Unknown(Option<String>),
}

/// Result of one registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Success(RegistrationSuccess),
    Failure(FailureReason),
}

impl RegistrationOutcome {
    /// Classify an HTTP response from the registration endpoint.
    pub fn classify(status: StatusCode, body: &str) -> Self {
        if status == StatusCode::OK {
            return Self::Success(parse_success(body));
        }

        let Ok(data) = serde_json::from_str::<Value>(body) else {
            return Self::Failure(FailureReason::Unknown(None));
        };

        // WordPress' own REST errors carry `message` instead of `error`
        let error = ["error", "message"]
            .iter()
            .find_map(|key| data.get(*key).and_then(Value::as_str))
            .map(str::trim)
            .filter(|s| !s.is_empty());

        Self::Failure(match error {
            Some(USER_EXISTS_ERROR) => FailureReason::UserExists,
            Some(MISSING_PARAMETERS_ERROR) => FailureReason::MissingParameters,
            Some(other) => FailureReason::Unknown(Some(other.to_string())),
            None => FailureReason::Unknown(Some(GENERIC_FAILURE_REASON.to_string())),
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Short machine-friendly label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success(s) if s.approval_pending => "success_pending_approval",
            Self::Success(s) if s.degraded => "success_unparsed",
            Self::Success(_) => "success",
            Self::Failure(FailureReason::UserExists) => "user_exists",
            Self::Failure(FailureReason::MissingParameters) => "missing_parameters",
            Self::Failure(FailureReason::MissingInformation) => "missing_information",
            Self::Failure(FailureReason::NetworkError(_)) => "network_error",
            Self::Failure(FailureReason::Unknown(_)) => "rejected",
        }
    }

    /// The reply shown to the user.
    pub fn user_message(&self) -> OutgoingResponse {
        match self {
            Self::Success(s) if s.degraded => OutgoingResponse::text(
                "Registration successful, but there was an issue processing the server \
                 response. Please check your website directly.",
            ),
            Self::Success(s) if s.approval_pending => OutgoingResponse::text(
                "Registration successful! Your Employer account is now pending admin \
                 approval. You will be notified once your account is approved.",
            ),
            Self::Success(RegistrationSuccess {
                login_url: Some(url),
                ..
            }) => OutgoingResponse::markdown(format!(
                "Registration successful! Click to login: [Login]({url})"
            )),
            Self::Success(_) => OutgoingResponse::text("Registration successful!"),
            Self::Failure(reason) => OutgoingResponse::text(failure_message(reason)),
        }
    }
}

/// Reason used when the backend sent JSON without an error message.
const GENERIC_FAILURE_REASON: &str = "the server did not say why";

fn failure_message(reason: &FailureReason) -> String {
    match reason {
        FailureReason::UserExists => "Registration failed: Username or email is already \
             registered. Please use different details."
            .to_string(),
        FailureReason::MissingParameters => "Registration failed: Some required information \
             was missing. Please make sure you provided all details."
            .to_string(),
        FailureReason::MissingInformation => {
            "Missing information. Please restart with /start.".to_string()
        }
        FailureReason::NetworkError(detail) => format!(
            "Registration failed: network error ({detail}). Please try again later."
        ),
        FailureReason::Unknown(Some(message)) => {
            format!("Registration failed: {message}. Please try again later.")
        }
        FailureReason::Unknown(None) => "Registration failed due to an unexpected error. \
             Please try again later."
            .to_string(),
    }
}

fn parse_success(body: &str) -> RegistrationSuccess {
    let Ok(data) = serde_json::from_str::<Value>(body) else {
        return RegistrationSuccess {
            degraded: true,
            ..Default::default()
        };
    };

    RegistrationSuccess {
        login_url: data
            .get("login_url")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(String::from),
        approval_pending: data.get("approval_pending").is_some_and(is_truthy),
        meta_key: data.get("meta_key").and_then(scalar_to_string),
        meta_value: data.get("meta_value").and_then(scalar_to_string),
        user_id: data.get("user_id").and_then(scalar_to_string),
        degraded: false,
    }
}

/// Flags arrive as JSON booleans, 0/1, or "1"/"true" strings depending on
/// which plugin hook produced them.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        _ => false,
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
