//! Reset relay: answers password-reset request emails.

pub mod config;
pub mod error;
pub mod host;
pub mod http;
pub mod inbound;
pub mod relay;
pub mod reply;
pub mod upstream;
