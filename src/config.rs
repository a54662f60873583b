//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::dialogue::FlowVariant;
use crate::error::ConfigError;
use crate::registration::RegistrationConfig;

/// Default idle timeout before an unfinished registration is dropped.
pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(1800);

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Telegram bot token; `None` runs the CLI channel only.
    pub telegram_token: Option<SecretString>,
    /// Telegram usernames or ids allowed to talk to the bot (`*` = everyone).
    pub allowed_users: Vec<String>,
    /// Read registrations from stdin as well.
    pub cli_enabled: bool,
    pub registration: RegistrationConfig,
    pub flow: FlowVariant,
    /// Sessions untouched for this long are discarded.
    pub session_idle_timeout: Duration,
}

impl BotConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let telegram_token = var("BOT_TOKEN")
            .or_else(|| var("TELEGRAM_BOT_TOKEN"))
            .map(SecretString::from);

        let allowed_users: Vec<String> = var("TELEGRAM_ALLOWED_USERS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let cli_requested = match var("BOT_CLI") {
            Some(raw) => parse_bool("BOT_CLI", &raw)?,
            None => false,
        };

        let flow = match var("REGISTRATION_FLOW") {
            Some(raw) => raw.parse().map_err(|message| ConfigError::InvalidValue {
                key: "REGISTRATION_FLOW".into(),
                message,
            })?,
            None => FlowVariant::default(),
        };

        let session_idle_timeout = match var("SESSION_IDLE_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "SESSION_IDLE_TIMEOUT_SECS".into(),
                        message: format!("expected a positive number of seconds, got {raw:?}"),
                    });
                }
            },
            None => DEFAULT_SESSION_IDLE_TIMEOUT,
        };

        let registration = RegistrationConfig::from_lookup(&lookup)?;

        Ok(Self {
            cli_enabled: cli_requested || telegram_token.is_none(),
            telegram_token,
            allowed_users,
            registration,
            flow,
            session_idle_timeout,
        })
    }

    pub fn allows_everyone(&self) -> bool {
        self.allowed_users.iter().any(|u| u == "*")
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected true or false, got {raw:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<BotConfig, ConfigError> {
        let map: HashMap<&str, &str> = vars.iter().copied().collect();
        BotConfig::from_lookup(|key| map.get(key).map(|v| v.to_string()))
    }

    const BACKEND: [(&str, &str); 3] = [
        ("WORDPRESS_API_URL", "https://jobs.example.com/wp-json/custom/v1/register"),
        ("WORDPRESS_API_USERNAME", "api"),
        ("WORDPRESS_API_PASSWORD", "app-password"),
    ];

    fn with(extra: &[(&'static str, &'static str)]) -> Vec<(&'static str, &'static str)> {
        let mut vars = BACKEND.to_vec();
        vars.extend_from_slice(extra);
        vars
    }

    #[test]
    fn defaults_without_token_use_cli() {
        let config = load(&BACKEND).unwrap();
        assert!(config.telegram_token.is_none());
        assert!(config.cli_enabled);
        assert!(config.allows_everyone());
        assert_eq!(config.flow, FlowVariant::Keyed);
        assert_eq!(config.session_idle_timeout, DEFAULT_SESSION_IDLE_TIMEOUT);
    }

    #[test]
    fn token_disables_cli_unless_requested() {
        let config = load(&with(&[("BOT_TOKEN", "123:abc")])).unwrap();
        assert_eq!(config.telegram_token.unwrap().expose_secret(), "123:abc");
        assert!(!config.cli_enabled);

        let config = load(&with(&[("BOT_TOKEN", "123:abc"), ("BOT_CLI", "true")])).unwrap();
        assert!(config.cli_enabled);
    }

    #[test]
    fn telegram_bot_token_is_fallback() {
        let config = load(&with(&[("TELEGRAM_BOT_TOKEN", "456:def")])).unwrap();
        assert_eq!(config.telegram_token.unwrap().expose_secret(), "456:def");

        let config = load(&with(&[
            ("BOT_TOKEN", "123:abc"),
            ("TELEGRAM_BOT_TOKEN", "456:def"),
        ]))
        .unwrap();
        assert_eq!(config.telegram_token.unwrap().expose_secret(), "123:abc");
    }

    #[test]
    fn allowlist_is_split_and_trimmed() {
        let config = load(&with(&[("TELEGRAM_ALLOWED_USERS", " alice, 42 ,,bob")])).unwrap();
        assert_eq!(config.allowed_users, vec!["alice", "42", "bob"]);
        assert!(!config.allows_everyone());
    }

    #[test]
    fn flow_and_timeout_overrides() {
        let config = load(&with(&[
            ("REGISTRATION_FLOW", "fsm"),
            ("SESSION_IDLE_TIMEOUT_SECS", "60"),
        ]))
        .unwrap();
        assert_eq!(config.flow, FlowVariant::Fsm);
        assert_eq!(config.session_idle_timeout, Duration::from_secs(60));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = load(&with(&[("REGISTRATION_FLOW", "wizard")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "REGISTRATION_FLOW"));

        let err = load(&with(&[("SESSION_IDLE_TIMEOUT_SECS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "SESSION_IDLE_TIMEOUT_SECS"));

        let err = load(&with(&[("BOT_CLI", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "BOT_CLI"));
    }

    #[test]
    fn missing_backend_is_an_error() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }
}
