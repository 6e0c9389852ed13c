//! Reply composer: the plain-text notice sent back to the requester.

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::{Address, Message};

use crate::error::ComposeError;
use crate::inbound::InboundMessage;

/// Fixed subject of every reply.
pub const REPLY_SUBJECT: &str = "Re: Reset Wikipedia Password";

/// Help page linked from the notice.
pub const RESET_HELP_URL: &str = "https://www.mediawiki.org/wiki/Help:Reset_password";

/// A reply ready to hand to the mail host.
///
/// `from` is the service mailbox, `to` the original sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyMessage {
    pub from: String,
    pub sender_name: String,
    pub to: String,
    pub subject: String,
    /// `Message-ID` of the inbound mail; `None` omits `In-Reply-To`.
    pub in_reply_to: Option<String>,
    pub body: String,
}

impl ReplyMessage {
    /// Build the lettre message for transport.
    pub fn to_message(&self) -> Result<Message, ComposeError> {
        let from = Mailbox::new(
            Some(self.sender_name.clone()),
            parse_address("sender", &self.from)?,
        );
        let to = Mailbox::new(None, parse_address("recipient", &self.to)?);

        let mut builder = Message::builder().from(from).to(to).subject(&self.subject);
        if let Some(id) = &self.in_reply_to {
            builder = builder.in_reply_to(id.clone()).references(id.clone());
        }

        builder
            .header(ContentType::TEXT_PLAIN)
            .body(self.body.clone())
            .map_err(|e| ComposeError::Build(e.to_string()))
    }

    /// Raw RFC 5322 bytes of the reply.
    pub fn formatted(&self) -> Result<Vec<u8>, ComposeError> {
        Ok(self.to_message()?.formatted())
    }
}

/// Notice body for a reset requested on behalf of `address`.
pub fn reset_notice(address: &str) -> String {
    format!(
        "The service has requested a password reset for the email address: {address}.\n\
         \n\
         If there is a Wikimedia account associated with the address, a password\n\
         reset email will be sent by Wikimedia. If you haven't received an email,\n\
         please check the reset password help page ({RESET_HELP_URL})\n\
         or try again later. Nothing is sent for addresses without an account.\n\
         Only one password reset email will be sent per valid account every 24 hours.\n"
    )
}

/// Compose the reply to `inbound`, reversing its addresses.
pub fn compose_reply(
    inbound: &InboundMessage,
    sender_name: &str,
) -> Result<ReplyMessage, ComposeError> {
    let service = parse_address("sender", &inbound.to)?;
    let requester = parse_address("recipient", &inbound.from)?;

    if service.to_string().eq_ignore_ascii_case(&requester.to_string()) {
        return Err(ComposeError::SelfAddressed(service.to_string()));
    }

    Ok(ReplyMessage {
        from: service.to_string(),
        sender_name: sender_name.to_string(),
        to: requester.to_string(),
        subject: REPLY_SUBJECT.to_string(),
        in_reply_to: inbound.message_id.clone(),
        body: reset_notice(&requester.to_string()),
    })
}

fn parse_address(field: &'static str, address: &str) -> Result<Address, ComposeError> {
    address
        .trim()
        .parse()
        .map_err(|e: lettre::address::AddressError| ComposeError::InvalidAddress {
            field,
            address: address.to_string(),
            reason: e.to_string(),
        })
}
