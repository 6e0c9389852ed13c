//! Inbound message as handed over by the mail host.

use mail_parser::MessageParser;

use crate::error::InboundError;

/// One email delivered to the service mailbox.
///
/// Read-only to the relay. `from` and `to` are the envelope addresses when the
/// host supplies them, falling back to the `From`/`To` headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Original sender; the address a reset is requested for.
    pub from: String,
    /// Service mailbox the message was addressed to.
    pub to: String,
    /// `Message-ID` of the inbound mail in angle-bracket form, if present.
    pub message_id: Option<String>,
    /// Raw header name/value pairs in message order.
    pub headers: Vec<(String, String)>,
}

impl InboundMessage {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            message_id: None,
            headers: Vec::new(),
        }
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First header value with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Parse a raw RFC 5322 message.
    ///
    /// `envelope_from` / `envelope_to` take precedence over the headers, the
    /// way a pipe transport passes `$sender` and `$recipient`.
    pub fn parse(
        raw: &[u8],
        envelope_from: Option<&str>,
        envelope_to: Option<&str>,
    ) -> Result<Self, InboundError> {
        let parsed = MessageParser::default()
            .parse(raw)
            .ok_or(InboundError::Unparseable)?;

        let from = envelope_address(envelope_from)
            .or_else(|| first_address(parsed.from()))
            .ok_or(InboundError::MissingAddress("sender"))?;
        let to = envelope_address(envelope_to)
            .or_else(|| first_address(parsed.to()))
            .ok_or(InboundError::MissingAddress("recipient"))?;

        let message_id = parsed
            .message_id()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| format!("<{id}>"));

        let headers = parsed
            .headers_raw()
            .map(|(name, value)| (name.to_string(), value.trim().to_string()))
            .collect();

        Ok(Self {
            from,
            to,
            message_id,
            headers,
        })
    }
}

fn envelope_address(addr: Option<&str>) -> Option<String> {
    addr.map(str::trim)
        .filter(|a| !a.is_empty())
        .map(|a| a.trim_start_matches('<').trim_end_matches('>').to_string())
}

/// First email address from an optional mail_parser Address field.
fn first_address(addr: Option<&mail_parser::Address>) -> Option<String> {
    addr?
        .first()
        .and_then(|a| a.address())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = "From: User <user@example.com>\r\n\
To: reset@service.example.org\r\n\
Subject: Reset my password\r\n\
Message-ID: <abc123@mail.example.com>\r\n\
\r\n\
Please reset it.\r\n";

    #[test]
    fn parse_uses_headers_without_envelope() {
        let msg = InboundMessage::parse(RAW.as_bytes(), None, None).unwrap();
        assert_eq!(msg.from, "user@example.com");
        assert_eq!(msg.to, "reset@service.example.org");
        assert_eq!(msg.message_id.as_deref(), Some("<abc123@mail.example.com>"));
        assert_eq!(msg.header("subject"), Some("Reset my password"));
    }

    #[test]
    fn parse_envelope_overrides_headers() {
        let msg = InboundMessage::parse(
            RAW.as_bytes(),
            Some("<bounce@example.net>"),
            Some("inbox@service.example.org"),
        )
        .unwrap();
        assert_eq!(msg.from, "bounce@example.net");
        assert_eq!(msg.to, "inbox@service.example.org");
    }

    #[test]
    fn parse_blank_envelope_falls_back() {
        let msg = InboundMessage::parse(RAW.as_bytes(), Some("  "), None).unwrap();
        assert_eq!(msg.from, "user@example.com");
    }

    #[test]
    fn parse_null_envelope_sender_is_empty() {
        let msg = InboundMessage::parse(RAW.as_bytes(), Some("<>"), None).unwrap();
        assert_eq!(msg.from, "");
        assert_eq!(msg.to, "reset@service.example.org");
    }

    #[test]
    fn parse_without_message_id() {
        let raw = "From: user@example.com\r\nTo: reset@service.example.org\r\n\r\nhi\r\n";
        let msg = InboundMessage::parse(raw.as_bytes(), None, None).unwrap();
        assert!(msg.message_id.is_none());
        assert!(msg.header("Message-ID").is_none());
    }

    #[test]
    fn parse_without_recipient_fails() {
        let raw = "From: user@example.com\r\nSubject: x\r\n\r\nhi\r\n";
        let err = InboundMessage::parse(raw.as_bytes(), None, None).unwrap_err();
        assert!(matches!(err, InboundError::MissingAddress("recipient")));
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let msg = InboundMessage::new("a@example.com", "b@example.org")
            .with_header("Message-ID", "<x@y>");
        assert_eq!(msg.header("message-id"), Some("<x@y>"));
        assert_eq!(msg.header("MESSAGE-ID"), Some("<x@y>"));
    }
}
