use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use domain::error::{DomainErrorKind, Error as DomainError, ExternalErrorKind, InternalErrorKind};
use log::*;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(DomainError);

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

// Webhook senders only look at the status code to decide whether to retry, so every
// failure past signature verification is a plain-text 500 except an unreadable body.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self.0.error_kind {
            DomainErrorKind::Internal(internal_error_kind) => match internal_error_kind {
                InternalErrorKind::InvalidPayload => {
                    (StatusCode::BAD_REQUEST, "Invalid payload").into_response()
                }
                InternalErrorKind::Config | InternalErrorKind::Other(_) => {
                    error!("Internal error: {:?}", self.0.source);
                    (StatusCode::INTERNAL_SERVER_ERROR, "Error").into_response()
                }
            },
            DomainErrorKind::External(external_error_kind) => {
                match external_error_kind {
                    ExternalErrorKind::Upstream(status) => {
                        error!("Upstream error ({status}): {:?}", self.0.source)
                    }
                    ExternalErrorKind::Network | ExternalErrorKind::Other(_) => {
                        error!("Upstream error: {:?}", self.0.source)
                    }
                }
                (StatusCode::INTERNAL_SERVER_ERROR, "Error").into_response()
            }
        }
    }
}

impl<E> From<E> for Error
where
    E: Into<DomainError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error(error_kind: DomainErrorKind) -> Error {
        Error(DomainError {
            source: None,
            error_kind,
        })
    }

    #[test]
    fn test_invalid_payload_is_bad_request() {
        let response =
            error(DomainErrorKind::Internal(InternalErrorKind::InvalidPayload)).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_upstream_and_internal_failures_are_internal_server_error() {
        let kinds = [
            DomainErrorKind::External(ExternalErrorKind::Network),
            DomainErrorKind::External(ExternalErrorKind::Upstream(502)),
            DomainErrorKind::External(ExternalErrorKind::Other("decode".to_string())),
            DomainErrorKind::Internal(InternalErrorKind::Config),
            DomainErrorKind::Internal(InternalErrorKind::Other("build".to_string())),
        ];

        for kind in kinds {
            let response = error(kind).into_response();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}
