//! Error types for ESMTP transport operations.

use std::io;

/// Result type alias for ESMTP transport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// ESMTP transport error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// The server replied with a code outside the acceptable set.
    #[error("unexpected response {code}: {message}")]
    UnexpectedResponse {
        /// Reply code the server actually sent (e.g., 550).
        code: u16,
        /// The offending reply text.
        message: String,
    },

    /// Protocol error (malformed reply, truncated EHLO response, ...).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Invalid email address.
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    /// No registered extension handler exposes the requested mixin method.
    #[error("no extension handler exposes method {0:?}")]
    UnknownMethod(String),

    /// Feature not supported by server.
    #[error("server does not support {0}")]
    NotSupported(String),

    /// Operation is not valid in the transport's current state.
    #[error("invalid state for operation: {0}")]
    InvalidState(String),

    /// Every recipient of a message was rejected by the server.
    #[error("all recipients rejected: {0:?}")]
    AllRecipientsRejected(Vec<String>),
}

impl Error {
    /// Creates an [`Error::UnexpectedResponse`] from a reply code and text.
    #[must_use]
    pub fn unexpected(code: u16, message: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            code,
            message: message.into(),
        }
    }

    /// Returns true if this is a permanent server error (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::UnexpectedResponse { code, .. } if *code >= 500 && *code < 600)
    }

    /// Returns true if this is a transient server error (4xx).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::UnexpectedResponse { code, .. } if *code >= 400 && *code < 500)
    }
}
