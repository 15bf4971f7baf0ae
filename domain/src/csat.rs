//! Intercom conversation rating events and their mapping onto CRM contact properties.

use crate::contact::{ContactProperties, ContactUpdate};
use crate::error::{Error, InternalErrorKind};
use log::*;
use serde_json::{Number, Value};

/// The only Intercom topic this service acts on.
pub const CONVERSATION_RATING_CREATED: &str = "conversation_rating.created";

/// HubSpot property receiving the rating, rendered as a decimal string.
pub const CSAT_SCORE_PROPERTY: &str = "intercom_csat_score";

/// HubSpot property receiving the customer's free-text remark.
pub const CSAT_REMARK_PROPERTY: &str = "intercom_csat_remark";

/// Intercom webhook notification envelope.
///
/// Held as loose JSON: a signed body of an unexpected shape is still answered by
/// `extract`, with wrong-typed or absent fields reading as missing.
#[derive(Debug)]
pub struct InboundEvent {
    payload: Value,
}

impl InboundEvent {
    /// The notification topic, when present as a string.
    pub fn topic(&self) -> Option<&str> {
        self.payload.get("topic").and_then(Value::as_str)
    }

    fn item(&self) -> Option<&Value> {
        self.payload.get("data").and_then(|data| data.get("item"))
    }
}

/// Result of inspecting an event.
#[derive(Debug, PartialEq, Eq)]
pub enum Extraction {
    /// Topic is absent or not `conversation_rating.created`.
    Ignored,
    MissingEmail,
    MissingRating,
    Ready(ContactUpdate),
}

/// Parse a webhook body. Must only be called after the raw bytes have been verified.
///
/// Only bytes that are not JSON at all are an error.
pub fn parse_event(body: &[u8]) -> Result<InboundEvent, Error> {
    let payload: Value = serde_json::from_slice(body).map_err(|err| {
        warn!("Unable to parse webhook payload: {err}");
        Error {
            source: Some(Box::new(err)),
            ..Error::internal(InternalErrorKind::InvalidPayload)
        }
    })?;
    Ok(InboundEvent { payload })
}

/// Decide what to do with `event` and, for a usable rating, build the contact update.
pub fn extract(event: &InboundEvent) -> Extraction {
    if event.topic() != Some(CONVERSATION_RATING_CREATED) {
        return Extraction::Ignored;
    }

    let item = event.item();

    let email = item
        .and_then(|item| item.get("contact"))
        .and_then(|contact| contact.get("email"))
        .and_then(Value::as_str)
        .filter(|email| !email.is_empty());
    let Some(email) = email else {
        return Extraction::MissingEmail;
    };

    // A zero score is treated as no score
    let rating = item
        .and_then(|item| item.get("rating"))
        .and_then(|rating| match rating {
            Value::Number(number) if number.as_f64() != Some(0.0) => Some(number),
            _ => None,
        });
    let Some(rating) = rating else {
        return Extraction::MissingRating;
    };

    let remark = item
        .and_then(|item| item.get("remark"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    Extraction::Ready(ContactUpdate {
        email: email.to_string(),
        fields: ContactProperties::from([
            (CSAT_SCORE_PROPERTY.to_string(), render_rating(rating)),
            (CSAT_REMARK_PROPERTY.to_string(), remark.to_string()),
        ]),
    })
}

/// Render a JSON number the way it reads to a person: `5` and `5.0` both become `"5"`.
fn render_rating(rating: &Number) -> String {
    if let Some(int) = rating.as_i64() {
        return int.to_string();
    }
    if let Some(uint) = rating.as_u64() {
        return uint.to_string();
    }
    match rating.as_f64() {
        Some(float) if float.fract() == 0.0 && float.abs() < 1e15 => (float as i64).to_string(),
        Some(float) => float.to_string(),
        None => rating.to_string(),
    }
}
