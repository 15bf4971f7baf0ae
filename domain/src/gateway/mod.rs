//! Outbound HTTP clients for third-party APIs.
pub mod hubspot;
