//! Error types for the `webhook-auth` crate.
//!
//! Follows the same pattern as `domain::error`: a root Error struct holding an error
//! kind tree and an optional source for chaining.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for the webhook-auth crate.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in webhook-auth.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    Webhook(WebhookErrorKind),
}

/// Errors from webhook validation.
#[derive(Debug, PartialEq)]
pub enum WebhookErrorKind {
    /// The configured signature header was not present on the request.
    MissingSignature,
    /// The header was present but not of the form `sha1=<lowercase hex>`.
    InvalidSignature,
    /// The signing key could not be used to initialise the MAC.
    InvalidKey,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::Webhook(kind) => write!(f, "Webhook error: {:?}", kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

/// Helper function to create webhook errors.
pub fn webhook_error(kind: WebhookErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Webhook(kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_error_keeps_message_as_source() {
        let err = webhook_error(WebhookErrorKind::MissingSignature, "no header");

        assert_eq!(
            err.error_kind,
            ErrorKind::Webhook(WebhookErrorKind::MissingSignature)
        );
        assert_eq!(err.source().map(|s| s.to_string()), Some("no header".to_string()));
        assert_eq!(err.to_string(), "Webhook error: MissingSignature");
    }
}
