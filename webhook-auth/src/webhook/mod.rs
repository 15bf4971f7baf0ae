//! Webhook signature validation.

mod hmac;

pub use hmac::HmacSha1WebhookValidator;

use crate::error::Error;

/// Trait for validating webhook signatures.
pub trait WebhookValidator: Send + Sync {
    /// Validate a webhook request.
    ///
    /// # Arguments
    ///
    /// * `signature` - Value of the signature header, `None` when the header is absent
    /// * `body` - Raw request body bytes, untouched
    ///
    /// # Returns
    ///
    /// `Ok(true)` if the signature matches, `Ok(false)` if it is well formed but does
    /// not match, and an error if it is missing or malformed.
    fn validate(&self, signature: Option<&str>, body: &[u8]) -> Result<bool, Error>;

    /// Name of the request header that carries the signature.
    fn signature_header(&self) -> &str;

    /// Get the provider identifier for this validator.
    fn provider_id(&self) -> &str;

    /// Fail-closed boolean form of [`WebhookValidator::validate`]: anything other
    /// than a positive match is a rejection.
    fn verify(&self, signature: Option<&str>, body: &[u8]) -> bool {
        matches!(self.validate(signature, body), Ok(true))
    }
}
