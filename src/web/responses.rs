//! HTTP error responses
//!
//! Every error leaving a handler becomes `{ "error": message }` with a status
//! derived from the error kind. Upstream failures are reported as 500 so the
//! catalog UI can show its retry panel.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::errors::{AppError, SourceError};

/// Body of every error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Status code an error maps to
pub fn status_for(error: &AppError) -> StatusCode {
    match error {
        AppError::Validation { .. } | AppError::Web(_) => StatusCode::BAD_REQUEST,
        AppError::Source(SourceError::UnknownSource { .. }) => StatusCode::BAD_REQUEST,
        AppError::Source(_)
        | AppError::Http(_)
        | AppError::Configuration { .. }
        | AppError::Json(_)
        | AppError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Convert AppError to appropriate HTTP response
pub fn handle_error(error: AppError) -> Response {
    let status = status_for(&error);
    let message = match &error {
        AppError::Validation { message } => message.clone(),
        AppError::Source(SourceError::Http { status, message }) => {
            format!("Upstream returned {status} {message}")
        }
        AppError::Http(e) if e.is_timeout() => "Upstream request timed out".to_string(),
        AppError::Http(e) => format!("Upstream request failed: {e}"),
        other => other.to_string(),
    };

    if status.is_server_error() {
        error!("Request failed: {}", error);
    } else {
        warn!("Request rejected: {}", error);
    }

    (status, Json(ErrorResponse::new(message))).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        handle_error(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::WebError;
    use rstest::rstest;

    #[rstest]
    #[case(AppError::validation("bad"), StatusCode::BAD_REQUEST)]
    #[case(WebError::InvalidRequest { field: "page".into(), message: "nope".into() }.into(), StatusCode::BAD_REQUEST)]
    #[case(SourceError::UnknownSource { name: "x".into() }.into(), StatusCode::BAD_REQUEST)]
    #[case(SourceError::Http { status: 502, message: "Bad Gateway".into() }.into(), StatusCode::INTERNAL_SERVER_ERROR)]
    #[case(SourceError::parse("json", "eof").into(), StatusCode::INTERNAL_SERVER_ERROR)]
    #[case(AppError::configuration("bad base url"), StatusCode::INTERNAL_SERVER_ERROR)]
    fn maps_errors_to_status(#[case] error: AppError, #[case] expected: StatusCode) {
        assert_eq!(status_for(&error), expected);
    }

    #[test]
    fn upstream_status_is_named_in_message() {
        let response = handle_error(
            SourceError::Http {
                status: 503,
                message: "Service Unavailable".into(),
            }
            .into(),
        );
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
