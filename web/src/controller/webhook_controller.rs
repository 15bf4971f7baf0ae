//! Controller for handling webhooks from external services.
//!
//! Handles Intercom `conversation_rating.created` notifications and mirrors the rating
//! onto the matching HubSpot contact.

use crate::{AppState, Error};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

use domain::contact::upsert_contact;
use domain::csat::{self, Extraction};
use log::*;

/// POST /webhook/intercom
///
/// The body is taken as raw bytes so the signature is checked against exactly what was
/// sent. Parsing only happens once the signature has been accepted.
#[utoipa::path(
    post,
    path = "/webhook/intercom",
    params(
        ("X-Hub-Signature" = String, Header, description = "sha1=<hex HMAC-SHA1 of the raw body>"),
    ),
    request_body(content = String, description = "Intercom notification JSON", content_type = "application/json"),
    responses(
        (status = 200, description = "Accepted: OK, Ignored, No email or No CSAT score", body = String),
        (status = 400, description = "Body is not JSON"),
        (status = 401, description = "Missing or invalid signature"),
        (status = 500, description = "HubSpot call failed"),
    )
)]
pub async fn intercom_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, Error> {
    if !signature_accepted(&app_state, &headers, &body) {
        return Ok((StatusCode::UNAUTHORIZED, "Unauthorized"));
    }

    let event = csat::parse_event(&body)?;
    let topic = event.topic().unwrap_or_default();
    debug!("Received Intercom webhook: {topic}");

    let update = match csat::extract(&event) {
        Extraction::Ready(update) => update,
        Extraction::Ignored => {
            debug!("Ignoring unhandled Intercom topic: {topic:?}");
            return Ok((StatusCode::OK, "Ignored"));
        }
        Extraction::MissingEmail => {
            warn!("No email found in payload");
            return Ok((StatusCode::OK, "No email"));
        }
        Extraction::MissingRating => {
            warn!("No CSAT score in payload");
            return Ok((StatusCode::OK, "No CSAT score"));
        }
    };

    upsert_contact(app_state.contact_store.as_ref(), &update).await?;

    Ok((StatusCode::OK, "OK"))
}

/// Fails closed: only a positive signature match, or the explicit skip flag, lets the
/// request through.
fn signature_accepted(app_state: &AppState, headers: &HeaderMap, body: &[u8]) -> bool {
    if app_state.config.skip_signature_verification {
        warn!("Signature verification is disabled, accepting unverified webhook");
        return true;
    }

    let validator = app_state.validator.as_ref();
    let signature = headers
        .get(validator.signature_header())
        .and_then(|v| v.to_str().ok());

    match validator.validate(signature, body) {
        Ok(true) => true,
        Ok(false) => {
            warn!("Invalid {} signature, rejected", validator.provider_id());
            false
        }
        Err(e) => {
            warn!("Rejected {} webhook: {e}", validator.provider_id());
            false
        }
    }
}
