//! Configuration types.
//!
//! Every value comes from the host environment. The `from_vars` constructors
//! take a lookup function so tests never touch the process environment.

use secrecy::SecretString;

use crate::error::ConfigError;

/// Display name used on outgoing replies when `RWP_SENDER_NAME` is unset.
pub const DEFAULT_SENDER_NAME: &str = "RWPWorker";

/// Relay configuration: where the reset authority lives and how to call it.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Base URL of the reset endpoint; the sender is appended as `?email=`.
    pub api_url: String,
    /// Token sent in the `x-api-token` header.
    pub api_token: SecretString,
    /// Display name for the `From` header of replies.
    pub sender_name: String,
}

impl RelayConfig {
    pub fn new(api_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_token: SecretString::from(api_token.into()),
            sender_name: DEFAULT_SENDER_NAME.to_string(),
        }
    }

    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = required(&lookup, "RWP_API")?;
        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                key: "RWP_API".into(),
                message: format!("expected an http(s) URL, got {api_url:?}"),
            });
        }
        let api_token = required(&lookup, "RWP_API_TOKEN")?;
        let sender_name = lookup("RWP_SENDER_NAME")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SENDER_NAME.to_string());

        Ok(Self {
            api_url,
            api_token: SecretString::from(api_token),
            sender_name,
        })
    }
}

/// SMTP submission settings for relaying replies.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
}

impl SmtpConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = required(&lookup, "SMTP_HOST")?;

        let port = match lookup("SMTP_PORT") {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: "SMTP_PORT".into(),
                message: format!("{raw:?}: {e}"),
            })?,
            None => 587,
        };

        let username = lookup("SMTP_USERNAME").unwrap_or_default();
        let password = lookup("SMTP_PASSWORD").unwrap_or_default();

        Ok(Self {
            host,
            port,
            username,
            password: SecretString::from(password),
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}
