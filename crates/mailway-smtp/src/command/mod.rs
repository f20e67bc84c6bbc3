//! SMTP command line builders.

use crate::types::Address;

/// SMTP command issued by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// EHLO - extended greeting.
    Ehlo {
        /// Client identity (local domain).
        domain: String,
    },
    /// HELO - fallback greeting for servers rejecting EHLO.
    Helo {
        /// Client identity (local domain).
        domain: String,
    },
    /// MAIL FROM - start mail transaction.
    MailFrom {
        /// Reverse path (sender).
        from: Address,
        /// Extension parameters appended in handler order.
        params: Vec<String>,
    },
    /// RCPT TO - add recipient.
    RcptTo {
        /// Forward path (recipient).
        to: Address,
        /// Extension parameters appended in handler order.
        params: Vec<String>,
    },
    /// DATA - begin message data.
    Data,
    /// RSET - reset transaction.
    Rset,
    /// QUIT - close connection.
    Quit,
}

impl Command {
    /// Serializes the command to its CRLF-terminated wire line.
    #[must_use]
    pub fn serialize(&self) -> String {
        let mut line = match self {
            Self::Ehlo { domain } => format!("EHLO {domain}"),
            Self::Helo { domain } => format!("HELO {domain}"),
            Self::MailFrom { from, params } => {
                let mut line = format!("MAIL FROM: <{from}>");
                for param in params {
                    line.push(' ');
                    line.push_str(param);
                }
                line
            }
            Self::RcptTo { to, params } => {
                let mut line = format!("RCPT TO: <{to}>");
                for param in params {
                    line.push(' ');
                    line.push_str(param);
                }
                line
            }
            Self::Data => "DATA".to_string(),
            Self::Rset => "RSET".to_string(),
            Self::Quit => "QUIT".to_string(),
        };
        line.push_str("\r\n");
        line
    }
}
