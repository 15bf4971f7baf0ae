//! # webhook-auth
//!
//! Signature validation for inbound webhooks.
//!
//! Validators implement [`webhook::WebhookValidator`] and always operate on the raw
//! request body bytes exactly as received on the wire. Callers must never hand a
//! validator a re-serialized payload.
//!
//! ## Usage
//!
//! ```rust
//! use webhook_auth::webhook::{HmacSha1WebhookValidator, WebhookValidator};
//!
//! let validator = HmacSha1WebhookValidator::new(
//!     "intercom".to_string(),
//!     "secret".to_string(),
//!     "x-hub-signature".to_string(),
//! );
//! assert!(!validator.verify(None, b"{}"));
//! ```

pub mod error;
pub mod webhook;

pub use error::{Error, ErrorKind};
