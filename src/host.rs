//! Mail hosts: where replies go and how rejections are reported.

use std::io::Write;
use std::sync::Mutex;

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};
use secrecy::ExposeSecret;
use tracing::{info, warn};

use crate::config::SmtpConfig;
use crate::error::HostError;
use crate::relay::MailHost;
use crate::reply::ReplyMessage;

/// Relays replies through an SMTP submission server.
pub struct SmtpHost {
    config: SmtpConfig,
}

impl SmtpHost {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn send_failed(&self, reason: String) -> HostError {
        HostError::SendFailed {
            host: self.config.host.clone(),
            reason,
        }
    }

    fn transport(&self) -> Result<SmtpTransport, HostError> {
        let mut builder = SmtpTransport::relay(&self.config.host)
            .map_err(|e| self.send_failed(format!("SMTP relay error: {e}")))?
            .port(self.config.port);

        if !self.config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                self.config.username.clone(),
                self.config.password.expose_secret().to_string(),
            ));
        }

        Ok(builder.build())
    }
}

#[async_trait]
impl MailHost for SmtpHost {
    async fn deliver_reply(&self, reply: ReplyMessage) -> Result<(), HostError> {
        let message = reply
            .to_message()
            .map_err(|e| self.send_failed(e.to_string()))?;
        let transport = self.transport()?;

        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| self.send_failed(format!("SMTP send task panicked: {e}")))?
            .map_err(|e| self.send_failed(format!("SMTP send failed: {e}")))?;

        info!(to = %reply.to, smtp = %self.config.host, "Reply sent");
        Ok(())
    }

    async fn reject(&self, reason: &str) {
        warn!(reason = %reason, "Inbound message rejected");
    }
}

/// Writes the raw reply to a writer instead of sending it (dry run).
pub struct PrintHost<W> {
    out: Mutex<W>,
}

impl PrintHost<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> PrintHost<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl<W: Write + Send> MailHost for PrintHost<W> {
    async fn deliver_reply(&self, reply: ReplyMessage) -> Result<(), HostError> {
        let raw = reply.formatted().map_err(|e| HostError::SendFailed {
            host: "stdout".into(),
            reason: e.to_string(),
        })?;

        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        out.write_all(&raw)
            .and_then(|()| out.flush())
            .map_err(|e| HostError::SendFailed {
                host: "stdout".into(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn reject(&self, reason: &str) {
        warn!(reason = %reason, "Inbound message rejected (dry run)");
    }
}
