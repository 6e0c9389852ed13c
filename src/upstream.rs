//! Client for the password-reset authority.
//!
//! One `GET <api_url>?email=<sender>` per inbound message. The answer is
//! reduced to a [`ValidationResult`]; nothing is retried.

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::RelayConfig;
use crate::error::UpstreamError;

/// `user-agent` sent on every upstream call.
pub const USER_AGENT: &str = "rwpworker/0.0";

/// Header carrying the API token.
pub const API_TOKEN_HEADER: &str = "x-api-token";

/// Reason used when the response carries no usable status field.
pub const UNKNOWN_REASON: &str = "UNKNOWN REASON";

/// Outcome of asking the authority for a reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Success,
    Failure(UpstreamError),
}

impl ValidationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Human-readable failure reason, `None` on success.
    pub fn reason(&self) -> Option<String> {
        match self {
            Self::Success => None,
            Self::Failure(err) => Some(err.to_string()),
        }
    }
}

/// Something that can decide whether a reset was accepted for an address.
#[async_trait]
pub trait ResetAuthority: Send + Sync {
    async fn request_reset(&self, address: &str) -> ValidationResult;
}

/// HTTP implementation of [`ResetAuthority`].
pub struct ResetApiClient {
    client: reqwest::Client,
    api_url: String,
    api_token: SecretString,
}

impl ResetApiClient {
    pub fn new(config: &RelayConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: &RelayConfig) -> Self {
        Self {
            client,
            api_url: config.api_url.clone(),
            api_token: config.api_token.clone(),
        }
    }
}

#[async_trait]
impl ResetAuthority for ResetApiClient {
    async fn request_reset(&self, address: &str) -> ValidationResult {
        let address = address.trim();
        if address.is_empty() {
            return ValidationResult::Failure(UpstreamError::InvalidAddress(address.to_string()));
        }

        debug!(url = %self.api_url, sender = %address, "Requesting password reset");

        let resp = match self
            .client
            .get(&self.api_url)
            .query(&[("email", address)])
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(API_TOKEN_HEADER, self.api_token.expose_secret())
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, "Reset API request failed");
                return ValidationResult::Failure(UpstreamError::Unreachable(e.to_string()));
            }
        };

        let status = resp.status();
        let body = match resp.bytes().await {
            Ok(body) => body,
            Err(e) => {
                warn!(%status, error = %e, "Failed to read reset API response");
                return ValidationResult::Failure(UpstreamError::Unreachable(format!(
                    "failed to read response body: {e}"
                )));
            }
        };

        let result = interpret_response(status, &body);
        match result.reason() {
            None => info!(%status, sender = %address, "Reset API accepted the request"),
            Some(reason) => {
                info!(%status, sender = %address, %reason, "Reset API refused the request")
            }
        }
        result
    }
}

/// Map an upstream HTTP status and body to a [`ValidationResult`].
///
/// Only a 2xx response whose `resetpassword.status` is exactly `"success"`
/// counts as success.
pub fn interpret_response(status: StatusCode, body: &[u8]) -> ValidationResult {
    if !status.is_success() {
        return ValidationResult::Failure(UpstreamError::Status(status_text(status)));
    }

    let parsed: ResetResponse = match serde_json::from_slice(body) {
        Ok(parsed) => parsed,
        Err(e) => {
            return ValidationResult::Failure(UpstreamError::Payload(format!(
                "{UNKNOWN_REASON} (malformed JSON body: {e})"
            )));
        }
    };

    match parsed.resetpassword.and_then(|r| r.status) {
        Some(Value::String(s)) if s == "success" => ValidationResult::Success,
        Some(Value::String(s)) => ValidationResult::Failure(UpstreamError::Payload(s)),
        None | Some(Value::Null) => {
            ValidationResult::Failure(UpstreamError::Payload(UNKNOWN_REASON.to_string()))
        }
        Some(other) => ValidationResult::Failure(UpstreamError::Payload(other.to_string())),
    }
}

/// Body of the reset endpoint: MediaWiki's `resetpassword` API result.
#[derive(Debug, Deserialize)]
struct ResetResponse {
    #[serde(default)]
    resetpassword: Option<ResetPasswordResult>,
}

#[derive(Debug, Deserialize)]
struct ResetPasswordResult {
    #[serde(default)]
    status: Option<Value>,
}

/// `"<code> <reason>"`, e.g. `500 Internal Server Error`.
fn status_text(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {reason}", status.as_u16()),
        None => status.as_u16().to_string(),
    }
}
