//! Contact resolution and upsert against the CRM.
//!
//! Every call re-resolves the contact by searching on email; nothing is cached between
//! requests. The search and the following write are two separate remote calls, so two
//! concurrent deliveries for a brand new email can both see "no match" and both create
//! a contact. The store offers no conditional create to close that window, and the
//! upsert does not try to detect it.

use crate::error::Error;
use async_trait::async_trait;
use log::*;
use std::collections::BTreeMap;

/// CRM property name to value. Ordered so outbound payloads are deterministic.
pub type ContactProperties = BTreeMap<String, String>;

/// Name of the CRM property holding a contact's email address.
pub const EMAIL_PROPERTY: &str = "email";

/// A set of CRM properties to apply to the contact identified by `email`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactUpdate {
    pub email: String,
    pub fields: ContactProperties,
}

/// A contact as returned by the CRM search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteContact {
    pub id: String,
    pub email: Option<String>,
}

/// What `upsert_contact` ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new contact was created, keyed by this email.
    Created { email: String },
    /// The existing contact with this id received a partial update.
    Updated { id: String },
}

/// Remote contact store operations needed by the upsert.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// Exact-match search on the email property, in the store's own result order.
    async fn search_by_email(&self, email: &str) -> Result<Vec<RemoteContact>, Error>;

    /// Merge `properties` into the contact `id`, leaving every other property untouched.
    async fn update(&self, id: &str, properties: &ContactProperties) -> Result<(), Error>;

    async fn create(&self, properties: &ContactProperties) -> Result<(), Error>;
}

/// Update the contact matching `update.email`, or create it when none exists.
///
/// When the search returns several candidates the first one, in the order the store
/// returned them, receives the update.
pub async fn upsert_contact(
    store: &dyn ContactStore,
    update: &ContactUpdate,
) -> Result<UpsertOutcome, Error> {
    let candidates = store.search_by_email(&update.email).await?;

    if candidates.len() > 1 {
        warn!(
            "{} contacts match {}, updating the first: {}",
            candidates.len(),
            update.email,
            describe_candidates(&candidates)
        );
    }

    match candidates.into_iter().next() {
        Some(existing) => {
            store.update(&existing.id, &update.fields).await?;
            info!("Updated contact {} for {}", existing.id, update.email);
            Ok(UpsertOutcome::Updated { id: existing.id })
        }
        None => {
            let mut properties =
                ContactProperties::from([(EMAIL_PROPERTY.to_string(), update.email.clone())]);
            properties.extend(update.fields.clone());

            store.create(&properties).await?;
            info!("Created new contact for {}", update.email);
            Ok(UpsertOutcome::Created {
                email: update.email.clone(),
            })
        }
    }
}

/// `id <email>` for each candidate, in search order.
fn describe_candidates(candidates: &[RemoteContact]) -> String {
    candidates
        .iter()
        .map(|candidate| {
            format!(
                "{} <{}>",
                candidate.id,
                candidate.email.as_deref().unwrap_or("no email")
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}
