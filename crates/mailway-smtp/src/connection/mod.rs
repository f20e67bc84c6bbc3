//! Connection management: channel abstraction, TCP/TLS stream and the ESMTP
//! transport.

mod channel;
mod stream;
mod transport;

pub use channel::Channel;
pub use stream::{SmtpStream, StreamChannel, connect, connect_tls};
pub use transport::{EsmtpTransport, Invocation};
