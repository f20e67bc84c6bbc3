//! SIZE extension handler (RFC 1870).

use async_trait::async_trait;

use super::{EsmtpHandler, MixinValue};
use crate::error::{Error, Result};

/// Handler for the SIZE extension.
///
/// Records the server's advertised message size limit from the EHLO
/// parameters and, once a message size has been declared via the
/// `set_message_size` mixin, contributes a `SIZE=<n>` parameter to MAIL FROM.
#[derive(Debug, Default)]
pub struct SizeHandler {
    max_size: Option<u64>,
    message_size: Option<u64>,
}

impl SizeHandler {
    /// Creates a SIZE handler with no declared message size.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The server's advertised limit, if it sent one.
    #[must_use]
    pub const fn max_size(&self) -> Option<u64> {
        self.max_size
    }

    /// Declares the size of the message about to be sent.
    pub const fn set_message_size(&mut self, size: u64) {
        self.message_size = Some(size);
    }
}

#[async_trait]
impl EsmtpHandler for SizeHandler {
    fn handled_keyword(&self) -> &str {
        "SIZE"
    }

    fn set_keyword_params(&mut self, params: &[String]) {
        self.max_size = params.first().and_then(|p| p.parse().ok());
    }

    fn mail_params(&self) -> Option<String> {
        self.message_size.map(|size| format!("SIZE={size}"))
    }

    fn exposed_methods(&self) -> &[&str] {
        &["set_message_size"]
    }

    fn invoke_exposed(&mut self, method: &str, args: &[MixinValue]) -> Result<Option<MixinValue>> {
        match method {
            "set_message_size" => {
                let size = args
                    .first()
                    .and_then(MixinValue::as_int)
                    .and_then(|n| u64::try_from(n).ok())
                    .ok_or_else(|| {
                        Error::InvalidState("set_message_size expects a non-negative integer".into())
                    })?;
                self.set_message_size(size);
                Ok(None)
            }
            _ => Err(Error::UnknownMethod(method.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn records_advertised_limit() {
        let mut handler = SizeHandler::new();
        handler.set_keyword_params(&["123456".to_string()]);
        assert_eq!(handler.max_size(), Some(123456));
    }

    #[test]
    fn tolerates_bare_keyword() {
        let mut handler = SizeHandler::new();
        handler.set_keyword_params(&[]);
        assert_eq!(handler.max_size(), None);
    }

    #[test]
    fn contributes_mail_param_only_when_size_declared() {
        let mut handler = SizeHandler::new();
        assert_eq!(handler.mail_params(), None);
        handler.set_message_size(2048);
        assert_eq!(handler.mail_params(), Some("SIZE=2048".to_string()));
        assert_eq!(handler.rcpt_params(), None);
    }

    #[test]
    fn mixin_setter_is_fluent() {
        let mut handler = SizeHandler::new();
        let ret = handler
            .invoke_exposed("set_message_size", &[MixinValue::Int(512)])
            .unwrap();
        assert_eq!(ret, None);
        assert_eq!(handler.mail_params(), Some("SIZE=512".to_string()));
    }

    #[test]
    fn mixin_rejects_unknown_method() {
        let mut handler = SizeHandler::new();
        assert!(matches!(
            handler.invoke_exposed("set_username", &[]),
            Err(Error::UnknownMethod(_))
        ));
    }

    #[test]
    fn mixin_rejects_bad_argument() {
        let mut handler = SizeHandler::new();
        assert!(
            handler
                .invoke_exposed("set_message_size", &[MixinValue::Str("big".into())])
                .is_err()
        );
    }
}
