//! The ESMTP transport: negotiation dispatcher, command pipeline and mixin
//! facade over an ordered set of extension handlers.

use std::collections::HashMap;
use std::mem;

use super::Channel;
use crate::command::Command;
use crate::error::{Error, Result};
use crate::extension::{EsmtpHandler, Intercept, MixinValue, mixin_table, sort_handlers};
use crate::parser::{is_last_reply_line, parse_capabilities, parse_reply};
use crate::types::{CapabilitySet, Envelope, Reply, ReplyCode};

/// Result of a forwarded mixin method call.
#[must_use]
pub enum Invocation<'a> {
    /// The handler returned the "no value" sentinel; the transport stands in
    /// as the return value so calls can be chained.
    Fluent(&'a mut EsmtpTransport),
    /// The handler returned a concrete value, passed through unchanged.
    Value(MixinValue),
}

impl std::fmt::Debug for Invocation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fluent(_) => f.write_str("Fluent"),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

impl Invocation<'_> {
    /// Returns true if the call was fluent.
    pub const fn is_fluent(&self) -> bool {
        matches!(self, Self::Fluent(_))
    }

    /// Returns the concrete value, if the call produced one.
    pub fn into_value(self) -> Option<MixinValue> {
        match self {
            Self::Fluent(_) => None,
            Self::Value(value) => Some(value),
        }
    }
}

/// ESMTP client transport with pluggable extension handlers.
///
/// The transport owns the command channel, the ordered handler set and the
/// capability set of the most recent EHLO exchange. Handlers whose keyword
/// was advertised ("matched" handlers) participate in post-EHLO callbacks,
/// MAIL/RCPT parameter augmentation and command interception; mixin method
/// exposure is independent of match state.
///
/// During any dispatch loop the handler set is detached from the transport,
/// so a callback receiving `&mut EsmtpTransport` can issue commands but
/// cannot observe or replace the handler list; re-registration from inside a
/// callback is lost when the loop ends.
pub struct EsmtpTransport {
    channel: Box<dyn Channel>,
    handlers: Vec<Box<dyn EsmtpHandler>>,
    mixins: HashMap<String, usize>,
    capabilities: CapabilitySet,
    local_domain: String,
    started: bool,
}

impl EsmtpTransport {
    /// Creates a transport over a channel, announcing `local_domain` in EHLO.
    #[must_use]
    pub fn new(channel: Box<dyn Channel>, local_domain: impl Into<String>) -> Self {
        Self {
            channel,
            handlers: Vec::new(),
            mixins: HashMap::new(),
            capabilities: CapabilitySet::new(),
            local_domain: local_domain.into(),
            started: false,
        }
    }

    /// Replaces the whole extension handler set.
    ///
    /// The set is immediately re-sorted by declared priorities and the mixin
    /// dispatch table rebuilt.
    pub fn set_extension_handlers(&mut self, mut handlers: Vec<Box<dyn EsmtpHandler>>) {
        sort_handlers(&mut handlers);
        self.mixins = mixin_table(&handlers);
        self.handlers = handlers;
    }

    /// Returns the handler set in registry (priority) order.
    #[must_use]
    pub fn get_extension_handlers(&self) -> &[Box<dyn EsmtpHandler>] {
        &self.handlers
    }

    /// The capability set of the most recent EHLO exchange.
    #[must_use]
    pub const fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    /// The client identity announced in EHLO.
    #[must_use]
    pub fn local_domain(&self) -> &str {
        &self.local_domain
    }

    /// Reads the server greeting and performs the EHLO negotiation.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport was already started, the greeting
    /// is not 220, or negotiation fails.
    pub async fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(Error::InvalidState("transport already started".into()));
        }

        let greeting = self.read_reply(0).await?;
        if greeting.code != ReplyCode::SERVICE_READY {
            return Err(Error::unexpected(greeting.code.as_u16(), greeting.text()));
        }

        self.negotiate().await?;
        self.started = true;
        Ok(())
    }

    /// Performs one EHLO round-trip: sends EHLO, replaces the capability set
    /// and notifies matched handlers in registry order.
    ///
    /// Re-issuable, e.g. after a STARTTLS upgrade invalidates the previous
    /// capability set. Servers rejecting EHLO get a HELO fallback, leaving
    /// the capability set empty and no handler notified.
    ///
    /// # Errors
    ///
    /// Returns an error on a malformed capability response (no handler is
    /// notified in that case) or if a handler's post-EHLO callback fails.
    pub async fn negotiate(&mut self) -> Result<()> {
        let ehlo = Command::Ehlo {
            domain: self.local_domain.clone(),
        }
        .serialize();
        let sequence = self.channel.write_line(&ehlo).await?;
        let reply = self.read_reply(sequence).await?;

        if reply.code != ReplyCode::OK {
            tracing::debug!(code = reply.code.as_u16(), "EHLO rejected, trying HELO");
            let helo = Command::Helo {
                domain: self.local_domain.clone(),
            }
            .serialize();
            let sequence = self.channel.write_line(&helo).await?;
            let reply = self.read_reply(sequence).await?;
            Self::assert_reply_code(&reply, &[250])?;
            self.capabilities = CapabilitySet::new();
            return Ok(());
        }

        // Parse the whole response before notifying anyone: notification is
        // all-or-nothing relative to parse success.
        self.capabilities = parse_capabilities(&reply)?;
        tracing::debug!(count = self.capabilities.len(), "capabilities discovered");

        let mut handlers = mem::take(&mut self.handlers);
        let mut result = Ok(());
        for handler in &mut handlers {
            let params = match self.capabilities.get(handler.handled_keyword()) {
                Some(cap) => cap.params.clone(),
                None => continue,
            };
            handler.set_keyword_params(&params);
            if let Err(e) = handler.after_ehlo(self).await {
                result = Err(e);
                break;
            }
        }
        self.handlers = handlers;
        result
    }

    /// Executes a raw command line through the interception pipeline.
    ///
    /// Matched handlers are offered the command in registry order; the first
    /// to return [`Intercept::Handled`] supplies the reply and the line is
    /// never transmitted. Otherwise the line is sent and the reply read from
    /// the channel. Either way the reply must carry one of `codes` (an empty
    /// slice accepts anything).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedResponse`] on an unacceptable reply code,
    /// or any error raised by a handler or the channel.
    pub async fn execute_command(&mut self, line: &str, codes: &[u16]) -> Result<Reply> {
        self.execute(line, codes, None).await
    }

    async fn execute(
        &mut self,
        line: &str,
        codes: &[u16],
        mut failed_recipients: Option<&mut Vec<String>>,
    ) -> Result<Reply> {
        let mut handlers = mem::take(&mut self.handlers);
        let mut intercepted = None;
        for handler in &mut handlers {
            if !self.capabilities.contains(handler.handled_keyword()) {
                continue;
            }
            let failed = failed_recipients.as_mut().map(|v| &mut **v);
            match handler.on_command(self, line, codes, failed).await {
                Ok(Intercept::Pass) => {}
                Ok(Intercept::Handled(reply)) => {
                    tracing::debug!(
                        keyword = handler.handled_keyword(),
                        "command intercepted by handler"
                    );
                    intercepted = Some(Ok(reply));
                    break;
                }
                Err(e) => {
                    intercepted = Some(Err(e));
                    break;
                }
            }
        }
        self.handlers = handlers;

        let reply = match intercepted {
            Some(result) => result?,
            None => {
                tracing::trace!(line = line.trim_end(), "sending command");
                let sequence = self.channel.write_line(line).await?;
                self.read_reply(sequence).await?
            }
        };

        Self::assert_reply_code(&reply, codes)?;
        Ok(reply)
    }

    /// Writes one raw line to the channel and returns its sequence id.
    ///
    /// Exposed for intercepting handlers that perform their own send/receive
    /// cycle.
    ///
    /// # Errors
    ///
    /// Returns an error on connection loss.
    pub async fn write_line(&mut self, line: &str) -> Result<u64> {
        self.channel.write_line(line).await
    }

    /// Reads one complete (possibly multi-line) reply for a sequence id.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if the stream closes mid-reply or the reply
    /// is malformed.
    pub async fn read_reply(&mut self, sequence: u64) -> Result<Reply> {
        let mut lines = Vec::new();
        loop {
            let line = self.channel.read_line(sequence).await?;
            if line.is_empty() {
                return Err(Error::Protocol("connection closed mid-reply".into()));
            }
            let last = is_last_reply_line(&line);
            lines.push(line);
            if last {
                break;
            }
        }
        parse_reply(&lines)
    }

    /// Sends a message: MAIL FROM, RCPT TO per recipient, DATA, body.
    ///
    /// MAIL and RCPT lines are augmented with the matched handlers'
    /// parameter contributions in registry order. Rejected recipients are
    /// collected rather than aborting the transaction; the return value is
    /// the number of accepted recipients.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllRecipientsRejected`] (after resetting the
    /// transaction) if no recipient was accepted, or the first non-rejection
    /// error encountered.
    pub async fn send(&mut self, envelope: &Envelope, message: &[u8]) -> Result<usize> {
        if !self.started {
            return Err(Error::InvalidState("transport not started".into()));
        }

        let mail = Command::MailFrom {
            from: envelope.from.address.clone(),
            params: self.matched_mail_params(),
        }
        .serialize();
        self.execute(&mail, &[250], None).await?;

        let mut failed = Vec::new();
        let mut accepted = 0usize;
        for recipient in &envelope.to {
            let rcpt = Command::RcptTo {
                to: recipient.address.clone(),
                params: self.matched_rcpt_params(),
            }
            .serialize();
            match self.execute(&rcpt, &[250, 251, 252], Some(&mut failed)).await {
                Ok(_) => accepted += 1,
                Err(Error::UnexpectedResponse { code, message }) => {
                    tracing::warn!(
                        code,
                        recipient = recipient.address.as_str(),
                        message = %message,
                        "recipient rejected"
                    );
                    failed.push(recipient.address.as_str().to_string());
                }
                Err(e) => return Err(e),
            }
        }

        if accepted == 0 {
            self.execute(&Command::Rset.serialize(), &[250], None).await?;
            return Err(Error::AllRecipientsRejected(failed));
        }

        self.execute(&Command::Data.serialize(), &[354], None).await?;
        self.stream_message(message).await?;

        tracing::debug!(accepted, rejected = failed.len(), "message sent");
        Ok(accepted)
    }

    /// Sends QUIT and marks the transport stopped.
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT command fails.
    pub async fn quit(&mut self) -> Result<()> {
        self.execute(&Command::Quit.serialize(), &[221], None).await?;
        self.started = false;
        Ok(())
    }

    /// Forwards a method call to the first handler exposing `method`.
    ///
    /// Exposure is independent of match state. A handler returning the
    /// "no value" sentinel yields [`Invocation::Fluent`] carrying the
    /// transport itself; any concrete value passes through unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMethod`] if no registered handler exposes the
    /// method, or [`Error::InvalidState`] when called from inside a handler
    /// callback (the handler set is detached during dispatch).
    pub fn invoke(&mut self, method: &str, args: &[MixinValue]) -> Result<Invocation<'_>> {
        let index = *self
            .mixins
            .get(method)
            .ok_or_else(|| Error::UnknownMethod(method.to_string()))?;
        let handler = self.handlers.get_mut(index).ok_or_else(|| {
            Error::InvalidState("mixin methods are unavailable during handler dispatch".into())
        })?;
        let returned = handler.invoke_exposed(method, args)?;
        match returned {
            None => Ok(Invocation::Fluent(self)),
            Some(value) => Ok(Invocation::Value(value)),
        }
    }

    fn matched_mail_params(&self) -> Vec<String> {
        self.handlers
            .iter()
            .filter(|h| self.capabilities.contains(h.handled_keyword()))
            .filter_map(|h| h.mail_params())
            .filter(|p| !p.is_empty())
            .collect()
    }

    fn matched_rcpt_params(&self) -> Vec<String> {
        self.handlers
            .iter()
            .filter(|h| self.capabilities.contains(h.handled_keyword()))
            .filter_map(|h| h.rcpt_params())
            .filter(|p| !p.is_empty())
            .collect()
    }

    /// Streams the message body with CRLF normalization and dot-stuffing,
    /// then the terminating `.` line. The payload is passed through as raw
    /// bytes.
    async fn stream_message(&mut self, message: &[u8]) -> Result<()> {
        let mut lines = message.split(|&b| b == b'\n').peekable();
        while let Some(line) = lines.next() {
            // A body ending in a newline leaves one empty final fragment;
            // that is the line's terminator, not an extra blank line.
            if line.is_empty() && lines.peek().is_none() {
                break;
            }
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            let mut data = Vec::with_capacity(line.len() + 3);
            if line.starts_with(b".") {
                data.push(b'.');
            }
            data.extend_from_slice(line);
            data.extend_from_slice(b"\r\n");
            self.channel.write_bytes(&data).await?;
        }

        let sequence = self.channel.write_line(".\r\n").await?;
        let reply = self.read_reply(sequence).await?;
        Self::assert_reply_code(&reply, &[250])
    }

    fn assert_reply_code(reply: &Reply, codes: &[u16]) -> Result<()> {
        if codes.is_empty() || codes.contains(&reply.code.as_u16()) {
            Ok(())
        } else {
            Err(Error::unexpected(reply.code.as_u16(), reply.text()))
        }
    }
}
