//! Pluggable ESMTP extension handlers.
//!
//! Each handler implements the client side of one advertised ESMTP keyword
//! (AUTH, STARTTLS, SIZE, ...). The transport owns an ordered set of
//! handlers; after every EHLO exchange the handlers whose keyword was
//! advertised become *matched* and participate in parameter augmentation and
//! command interception. Mixin method exposure is independent of match state.

mod registry;
mod size;

pub(crate) use registry::{mixin_table, sort_handlers};
pub use size::SizeHandler;

use async_trait::async_trait;

use crate::connection::EsmtpTransport;
use crate::error::{Error, Result};
use crate::types::Reply;

/// Outcome of offering a command to a handler for interception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intercept {
    /// The handler did not act; the pipeline moves to the next handler.
    Pass,
    /// The handler performed the full send/receive cycle itself. The carried
    /// reply becomes the command's result; no later handler is offered the
    /// command and the original line is never transmitted.
    Handled(Reply),
}

/// Argument or return value of a mixin method call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MixinValue {
    /// String value.
    Str(String),
    /// Integer value.
    Int(i64),
    /// Boolean value.
    Bool(bool),
}

impl MixinValue {
    /// Returns the string payload, if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer payload, if this is an integer value.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&str> for MixinValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<i64> for MixinValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

/// Client-side behavior for one ESMTP extension keyword.
///
/// Every method except [`handled_keyword`](Self::handled_keyword) has a
/// neutral default, so a handler only implements the hooks it cares about.
/// Handlers must not mutate the transport's handler set from inside a
/// callback; the transport detaches the set for the duration of a dispatch.
#[async_trait]
pub trait EsmtpHandler: Send {
    /// The keyword this handler responds to, e.g. `"AUTH"`.
    fn handled_keyword(&self) -> &str;

    /// Signed ordering relation against another handler's keyword.
    ///
    /// Negative sorts this handler before the other, positive after, zero
    /// declares no relation. Unknown keywords are no relation.
    fn priority_over(&self, _keyword: &str) -> i32 {
        0
    }

    /// Receives the advertised parameter tokens for this handler's keyword.
    ///
    /// Called once per EHLO exchange, before [`after_ehlo`](Self::after_ehlo),
    /// and only when the keyword was advertised.
    fn set_keyword_params(&mut self, _params: &[String]) {}

    /// Post-negotiation callback, invoked in registry order for matched
    /// handlers only.
    ///
    /// # Errors
    ///
    /// An error aborts the negotiation and propagates to the caller.
    async fn after_ehlo(&mut self, _transport: &mut EsmtpTransport) -> Result<()> {
        Ok(())
    }

    /// Extra parameters to append to the MAIL FROM line, if any.
    fn mail_params(&self) -> Option<String> {
        None
    }

    /// Extra parameters to append to the RCPT TO line, if any.
    fn rcpt_params(&self) -> Option<String> {
        None
    }

    /// Offers an outgoing command for interception.
    ///
    /// `line` is the literal command line including its CRLF terminator and
    /// `codes` the caller's acceptable reply codes. Returning
    /// [`Intercept::Handled`] short-circuits the pipeline; the handler has
    /// then performed the send/receive cycle itself and its reply is subject
    /// to the same acceptable-code validation as the default path.
    ///
    /// # Errors
    ///
    /// An error aborts the command and propagates to the caller.
    async fn on_command(
        &mut self,
        _transport: &mut EsmtpTransport,
        _line: &str,
        _codes: &[u16],
        _failed_recipients: Option<&mut Vec<String>>,
    ) -> Result<Intercept> {
        Ok(Intercept::Pass)
    }

    /// Method names this handler grafts onto the transport's surface.
    fn exposed_methods(&self) -> &[&str] {
        &[]
    }

    /// Invokes one of the methods named by
    /// [`exposed_methods`](Self::exposed_methods).
    ///
    /// `Ok(None)` is the "no value" sentinel: the transport substitutes
    /// itself as the call's return value so calls can be chained.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMethod`] for a method this handler does not
    /// expose.
    fn invoke_exposed(&mut self, method: &str, _args: &[MixinValue]) -> Result<Option<MixinValue>> {
        Err(Error::UnknownMethod(method.to_string()))
    }
}
