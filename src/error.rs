//! Error types for the signup bot.

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Registration error: {0}")]
    Registration(#[from] RegistrationError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("No channel registered under name {0}")]
    UnknownChannel(String),
}

/// Errors building or configuring the registration client.
///
/// Failed registrations are not errors; they come back as
/// [`RegistrationOutcome::Failure`](crate::registration::RegistrationOutcome).
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("Invalid registration endpoint {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

/// Dialogue errors raised while turning a session into a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DialogueError {
    #[error("Registration data incomplete, missing: {}", .missing.join(", "))]
    IncompleteInput { missing: Vec<&'static str> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_input_lists_missing_fields() {
        let err = DialogueError::IncompleteInput {
            missing: vec!["email", "password"],
        };
        assert_eq!(
            err.to_string(),
            "Registration data incomplete, missing: email, password"
        );
    }

    #[test]
    fn config_error_converts_into_top_level() {
        let err: Error = ConfigError::MissingEnvVar("WORDPRESS_API_URL".into()).into();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("WORDPRESS_API_URL"));
    }
}
