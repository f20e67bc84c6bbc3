//! TCP/TLS stream handling and the production command channel.

use std::sync::Arc;

use async_trait::async_trait;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_rustls::{
    TlsConnector,
    rustls::{ClientConfig, RootCertStore},
};

use super::Channel;
use crate::error::{Error, Result};

/// SMTP stream (plain TCP or TLS).
#[derive(Debug)]
pub enum SmtpStream {
    /// Plain TCP connection.
    Tcp(BufReader<TcpStream>),
    /// TLS-encrypted connection.
    Tls(Box<BufReader<tokio_rustls::client::TlsStream<TcpStream>>>),
}

impl SmtpStream {
    /// Reads one physical line including its terminator. Returns an empty
    /// string at end of stream.
    async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        match self {
            Self::Tcp(reader) => {
                reader.read_line(&mut line).await?;
            }
            Self::Tls(reader) => {
                reader.read_line(&mut line).await?;
            }
        }
        Ok(line)
    }

    /// Writes and flushes data.
    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        match self {
            Self::Tcp(reader) => {
                reader.get_mut().write_all(data).await?;
                reader.get_mut().flush().await?;
            }
            Self::Tls(reader) => {
                reader.get_mut().write_all(data).await?;
                reader.get_mut().flush().await?;
            }
        }
        Ok(())
    }

    /// Upgrades a plain TCP stream to TLS (for STARTTLS).
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is already TLS or the handshake fails.
    pub async fn upgrade_to_tls(self, hostname: &str) -> Result<Self> {
        let tcp_stream = match self {
            Self::Tcp(reader) => reader.into_inner(),
            Self::Tls(_) => return Err(Error::Protocol("already using TLS".into())),
        };

        let connector = create_tls_connector();
        let server_name = ServerName::try_from(hostname.to_string())
            .map_err(|_| Error::Protocol(format!("invalid hostname: {hostname}")))?;

        let tls_stream = connector.connect(server_name, tcp_stream).await?;
        Ok(Self::Tls(Box::new(BufReader::new(tls_stream))))
    }
}

/// Production [`Channel`] over an [`SmtpStream`].
///
/// Assigns a monotonically increasing sequence id per write.
#[derive(Debug)]
pub struct StreamChannel {
    stream: SmtpStream,
    sequence: u64,
}

impl StreamChannel {
    /// Wraps a stream into a channel. Sequence ids start at 1; the server
    /// greeting is read against sequence 0, before any write.
    #[must_use]
    pub const fn new(stream: SmtpStream) -> Self {
        Self {
            stream,
            sequence: 0,
        }
    }

    /// Consumes the channel and returns the underlying stream.
    #[must_use]
    pub fn into_stream(self) -> SmtpStream {
        self.stream
    }
}

#[async_trait]
impl Channel for StreamChannel {
    async fn write_bytes(&mut self, data: &[u8]) -> Result<u64> {
        self.stream.write_all(data).await?;
        self.sequence += 1;
        Ok(self.sequence)
    }

    async fn read_line(&mut self, _sequence: u64) -> Result<String> {
        let line = self.stream.read_line().await?;
        if line.is_empty() {
            return Err(Error::Protocol("connection closed by server".into()));
        }
        Ok(line)
    }
}

/// Connects to an SMTP server over plain TCP.
///
/// # Errors
///
/// Returns an error if the connection fails.
pub async fn connect(hostname: &str, port: u16) -> Result<SmtpStream> {
    let addr = format!("{hostname}:{port}");
    let stream = TcpStream::connect(&addr).await?;
    Ok(SmtpStream::Tcp(BufReader::new(stream)))
}

/// Connects to an SMTP server over implicit TLS (port 465).
///
/// # Errors
///
/// Returns an error if the connection or TLS handshake fails.
pub async fn connect_tls(hostname: &str, port: u16) -> Result<SmtpStream> {
    let addr = format!("{hostname}:{port}");
    let tcp_stream = TcpStream::connect(&addr).await?;

    let connector = create_tls_connector();
    let server_name = ServerName::try_from(hostname.to_string())
        .map_err(|_| Error::Protocol(format!("invalid hostname: {hostname}")))?;

    let tls_stream = connector.connect(server_name, tcp_stream).await?;
    Ok(SmtpStream::Tls(Box::new(BufReader::new(tls_stream))))
}

/// Creates a TLS connector with the webpki root certificates.
fn create_tls_connector() -> TlsConnector {
    let root_store = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}
