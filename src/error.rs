//! Error types for the reset relay.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Inbound message error: {0}")]
    Inbound(#[from] InboundError),

    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Compose error: {0}")]
    Compose(#[from] ComposeError),

    #[error("Host error: {0}")]
    Host(#[from] HostError),
}

// sysexits(3)
pub const EX_DATAERR: u8 = 65;
pub const EX_NOPERM: u8 = 77;
pub const EX_CONFIG: u8 = 78;

impl Error {
    /// Process exit status reported to the MTA for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => EX_CONFIG,
            Self::Inbound(_) => EX_DATAERR,
            Self::Upstream(_) | Self::Compose(_) | Self::Host(_) => EX_NOPERM,
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors reading the inbound message handed over by the host.
#[derive(Debug, thiserror::Error)]
pub enum InboundError {
    #[error("Failed to parse inbound message")]
    Unparseable,

    #[error("Inbound message has no {0} address")]
    MissingAddress(&'static str),

    #[error("Failed to read inbound message: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures talking to the password-reset authority.
///
/// The `Display` text of each variant is the rejection reason handed to the
/// mail host.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    #[error("Upstream unreachable: {0}")]
    Unreachable(String),

    #[error("Invalid upstream response status: {0}")]
    Status(String),

    #[error("Invalid upstream response: {0}")]
    Payload(String),

    #[error("Invalid sender address: {0:?}")]
    InvalidAddress(String),
}

/// Errors building the reply message.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("Invalid {field} address {address:?}: {reason}")]
    InvalidAddress {
        field: &'static str,
        address: String,
        reason: String,
    },

    #[error("Refusing to reply to the service address itself: {0}")]
    SelfAddressed(String),

    #[error("Failed to build reply: {0}")]
    Build(String),
}

/// Errors raised by the mail host while delivering a reply.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("Failed to deliver reply via {host}: {reason}")]
    SendFailed { host: String, reason: String },
}

/// Result type alias for the relay.
pub type Result<T> = std::result::Result<T, Error>;
