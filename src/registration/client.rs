//! HTTP client for the job board's registration endpoint.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::error::{ConfigError, RegistrationError};

use super::model::RegistrationRequest;
use super::outcome::{FailureReason, RegistrationOutcome};

/// User-Agent sent unless overridden by configuration.
pub const DEFAULT_USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Registration endpoint configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct RegistrationConfig {
    pub endpoint: Url,
    pub api_username: String,
    pub api_password: SecretString,
    pub user_agent: String,
    /// Whole-request timeout; `None` leaves reqwest's default (no timeout).
    pub timeout: Option<Duration>,
}

impl RegistrationConfig {
    /// Build config from a variable source (the process environment in
    /// production, see [`crate::config::BotConfig::from_env`]).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required =
            |key: &str| var(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()));

        let raw_endpoint = required("WORDPRESS_API_URL")?;
        let endpoint = parse_endpoint(&raw_endpoint).map_err(|e| ConfigError::InvalidValue {
            key: "WORDPRESS_API_URL".into(),
            message: e.to_string(),
        })?;

        let api_username = required("WORDPRESS_API_USERNAME")?;
        let api_password = SecretString::from(required("WORDPRESS_API_PASSWORD")?);

        let user_agent =
            var("REGISTRATION_USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        let timeout = match var("REGISTRATION_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "REGISTRATION_TIMEOUT_SECS".into(),
                    message: format!("expected a whole number of seconds, got {raw:?}"),
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            endpoint,
            api_username,
            api_password,
            user_agent,
            timeout,
        })
    }
}

/// Parse and check a registration endpoint URL.
pub fn parse_endpoint(raw: &str) -> Result<Url, RegistrationError> {
    let url = Url::parse(raw).map_err(|e| RegistrationError::InvalidEndpoint {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(RegistrationError::InvalidEndpoint {
            url: raw.to_string(),
            reason: format!("unsupported scheme {scheme}"),
        }),
    }
}

/// Something that can carry a registration to the backend.
#[async_trait]
pub trait Registrar: Send + Sync {
    /// Make exactly one attempt to register `request`.
    async fn submit(&self, request: &RegistrationRequest) -> RegistrationOutcome;
}

/// Sends registrations to the backend over HTTP with Basic auth.
pub struct RegistrationClient {
    config: RegistrationConfig,
    client: reqwest::Client,
}

impl RegistrationClient {
    pub fn new(config: RegistrationConfig) -> Result<Self, RegistrationError> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.as_str());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| RegistrationError::ClientBuild(e.to_string()))?;

        Ok(Self { config, client })
    }

    pub fn endpoint(&self) -> &Url {
        &self.config.endpoint
    }
}

#[async_trait]
impl Registrar for RegistrationClient {
    async fn submit(&self, request: &RegistrationRequest) -> RegistrationOutcome {
        tracing::info!(
            endpoint = %self.config.endpoint,
            username = %request.username,
            role = %request.role,
            "Sending registration request"
        );
        if let Ok(payload) = serde_json::to_string(&request.redacted_payload()) {
            tracing::debug!(%payload, "Registration request payload");
        }

        let sent = self
            .client
            .post(self.config.endpoint.clone())
            .basic_auth(
                &self.config.api_username,
                Some(self.config.api_password.expose_secret()),
            )
            .json(&request.payload())
            .send()
            .await;

        let response = match sent {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(username = %request.username, "Registration request failed: {e}");
                return network_error(e);
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(%status, "Failed to read registration response body: {e}");
                return network_error(e);
            }
        };

        tracing::info!(status = status.as_u16(), "Registration API responded");
        tracing::debug!(%body, "Registration API response body");

        let outcome = RegistrationOutcome::classify(status, &body);
        match &outcome {
            RegistrationOutcome::Success(s) => tracing::info!(
                user_id = s.user_id.as_deref().unwrap_or("-"),
                meta_key = s.meta_key.as_deref().unwrap_or("-"),
                meta_value = s.meta_value.as_deref().unwrap_or("-"),
                approval_pending = s.approval_pending,
                login_url = s.login_url.as_deref().unwrap_or("-"),
                outcome = outcome.label(),
                "Registration successful"
            ),
            RegistrationOutcome::Failure(reason) => tracing::info!(
                ?reason,
                outcome = outcome.label(),
                "Registration rejected"
            ),
        }
        outcome
    }
}

/// Transport failure as shown to the user. The endpoint URL stays in the
/// logs only.
fn network_error(err: reqwest::Error) -> RegistrationOutcome {
    let detail = error_chain(&err.without_url());
    RegistrationOutcome::Failure(FailureReason::NetworkError(detail))
}

/// Render an error with its sources; reqwest's top-level message alone
/// ("error sending request for url") hides the actual cause.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join(": ")
}
