//! # mailway-smtp
//!
//! An ESMTP client transport (RFC 5321/1869) built around pluggable
//! extension handlers.
//!
//! ## Features
//!
//! - **Extension handlers**: each advertised ESMTP keyword (AUTH, STARTTLS,
//!   SIZE, ...) is handled by a pluggable [`EsmtpHandler`] that reacts to
//!   discovered capabilities, augments MAIL/RCPT command lines, intercepts
//!   arbitrary commands and grafts mixin methods onto the transport
//! - **Deterministic ordering**: handlers declare pairwise priorities and
//!   are kept in a stable registry order
//! - **Capability negotiation**: EHLO capability parsing with per-session
//!   capability sets, re-negotiable after STARTTLS
//! - **TLS support**: implicit TLS (port 465) and a STARTTLS stream upgrade
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailway_smtp::{Envelope, EsmtpTransport, Mailbox, SizeHandler, StreamChannel};
//! use mailway_smtp::connection::connect;
//!
//! #[tokio::main]
//! async fn main() -> mailway_smtp::Result<()> {
//!     let stream = connect("smtp.example.com", 587).await?;
//!     let mut transport = EsmtpTransport::new(
//!         Box::new(StreamChannel::new(stream)),
//!         "client.example.com",
//!     );
//!     transport.set_extension_handlers(vec![Box::new(SizeHandler::new())]);
//!
//!     // Greeting + EHLO; matched handlers are notified of their parameters.
//!     transport.start().await?;
//!
//!     let envelope = Envelope::new(
//!         Mailbox::new("sender@example.com")?,
//!         vec![Mailbox::new("recipient@example.com")?],
//!     )?;
//!     let message = b"Subject: Test\r\n\r\nHello, World!\r\n";
//!     transport.send(&envelope, message).await?;
//!
//!     transport.quit().await
//! }
//! ```
//!
//! ## Modules
//!
//! - [`command`]: SMTP command line builders
//! - [`connection`]: channel abstraction, TCP/TLS stream and the transport
//! - [`extension`]: the extension handler contract and bundled handlers
//! - [`parser`]: reply and capability parsing
//! - [`types`]: addresses, replies, capabilities, envelopes

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod extension;
pub mod parser;
pub mod types;

pub use connection::{
    Channel, EsmtpTransport, Invocation, SmtpStream, StreamChannel, connect, connect_tls,
};
pub use error::{Error, Result};
pub use extension::{EsmtpHandler, Intercept, MixinValue, SizeHandler};
pub use types::{Address, Capability, CapabilitySet, Envelope, Mailbox, Reply, ReplyCode};
