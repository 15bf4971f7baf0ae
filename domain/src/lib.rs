//! Business rules for syncing Intercom conversation ratings into HubSpot contacts.
//!
//! The flow is split so each step can be exercised on its own:
//! [`csat`] turns a raw webhook body into a [`contact::ContactUpdate`],
//! [`contact::upsert_contact`] resolves and writes that update through a
//! [`contact::ContactStore`], and [`gateway::hubspot`] is the HTTP-backed store.

pub mod contact;
pub mod csat;
pub mod error;

pub mod gateway;
