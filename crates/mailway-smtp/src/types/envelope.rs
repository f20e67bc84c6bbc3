//! Message envelope consumed by the transport.

use super::Mailbox;
use crate::error::{Error, Result};

/// The sender and recipients of one mail transaction.
///
/// The transport only consumes the envelope to build MAIL FROM / RCPT TO
/// command lines; message content is passed separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Reverse path (sender).
    pub from: Mailbox,
    /// Forward paths (recipients), in order.
    pub to: Vec<Mailbox>,
}

impl Envelope {
    /// Creates an envelope with one sender and at least one recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if the recipient list is empty.
    pub fn new(from: Mailbox, to: Vec<Mailbox>) -> Result<Self> {
        if to.is_empty() {
            return Err(Error::InvalidState("envelope has no recipients".into()));
        }
        Ok(Self { from, to })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn requires_recipients() {
        let from = Mailbox::new("me@domain.tld").unwrap();
        assert!(Envelope::new(from, vec![]).is_err());
    }

    #[test]
    fn keeps_recipient_order() {
        let from = Mailbox::new("me@domain.tld").unwrap();
        let to = vec![
            Mailbox::new("a@bar.tld").unwrap(),
            Mailbox::new("b@bar.tld").unwrap(),
        ];
        let envelope = Envelope::new(from, to).unwrap();
        assert_eq!(envelope.to[0].address.as_str(), "a@bar.tld");
        assert_eq!(envelope.to[1].address.as_str(), "b@bar.tld");
    }
}
