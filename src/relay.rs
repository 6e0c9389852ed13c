//! Relay orchestration: validate, then reply or reject.
//!
//! One call to [`handle_email`] consumes one inbound message and performs
//! exactly one terminal action on the host: a delivered reply, or a rejection.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::RelayConfig;
use crate::error::{Error, HostError, Result};
use crate::inbound::InboundMessage;
use crate::reply::{ReplyMessage, compose_reply};
use crate::upstream::{ResetAuthority, ValidationResult};

/// Terminal state of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Replied,
    Rejected { reason: String },
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Replied => "replied",
            Self::Rejected { .. } => "rejected",
        }
    }
}

/// The mail host's two terminal actions.
#[async_trait]
pub trait MailHost: Send + Sync {
    /// Deliver a reply to the original sender.
    async fn deliver_reply(&self, reply: ReplyMessage) -> std::result::Result<(), HostError>;

    /// Mark the inbound message as rejected.
    async fn reject(&self, reason: &str);
}

/// Handle one inbound message end to end.
pub async fn handle_email(
    config: &RelayConfig,
    authority: &dyn ResetAuthority,
    host: &dyn MailHost,
    inbound: &InboundMessage,
) -> Outcome {
    match relay(config, authority, host, inbound).await {
        Ok(()) => {
            info!(sender = %inbound.from, "Password reset reply sent");
            Outcome::Replied
        }
        Err(e) => {
            let reason = e.to_string();
            warn!(sender = %inbound.from, reason = %reason, "Rejecting inbound message");
            host.reject(&reason).await;
            Outcome::Rejected { reason }
        }
    }
}

async fn relay(
    config: &RelayConfig,
    authority: &dyn ResetAuthority,
    host: &dyn MailHost,
    inbound: &InboundMessage,
) -> Result<()> {
    if let ValidationResult::Failure(e) = authority.request_reset(&inbound.from).await {
        return Err(Error::Upstream(e));
    }

    if inbound.message_id.is_none() {
        warn!(
            sender = %inbound.from,
            "Inbound message has no Message-ID; replying without In-Reply-To"
        );
    }
    let reply = compose_reply(inbound, &config.sender_name)?;
    host.deliver_reply(reply).await?;
    Ok(())
}
