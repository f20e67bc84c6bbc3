//! Line-oriented command channel abstraction.

use async_trait::async_trait;

use crate::error::Result;

/// The transport's view of the underlying connection.
///
/// The transport only sequences strict request/response round-trips into the
/// channel: every write returns a sequence id, and responses are read one
/// physical line at a time against that id. Blocking, timeouts and reconnect
/// policy all live behind this trait, never in the transport.
#[async_trait]
pub trait Channel: Send {
    /// Writes raw bytes and returns the sequence id of the write.
    ///
    /// Message data goes through here untouched; a non-UTF-8 payload must
    /// arrive at the server byte for byte.
    ///
    /// # Errors
    ///
    /// Returns an error on connection loss.
    async fn write_bytes(&mut self, data: &[u8]) -> Result<u64>;

    /// Writes one command line (terminator included by the caller) and
    /// returns the sequence id of the write.
    ///
    /// # Errors
    ///
    /// Returns an error on connection loss.
    async fn write_line(&mut self, line: &str) -> Result<u64> {
        self.write_bytes(line.as_bytes()).await
    }

    /// Reads one physical response line, including its terminator, for the
    /// given write sequence id. Multi-line replies require repeated calls.
    ///
    /// # Errors
    ///
    /// Returns an error on connection loss or if the peer closed the stream.
    async fn read_line(&mut self, sequence: u64) -> Result<String>;
}
