//! HTTP error mapping for the auction API.
//!
//! [`ApiError`] unifies all failure modes into a single enum that
//! converts into an Axum response. Validation failures come back as
//! 4xx with the engine's message; storage failures surface as a 500
//! `transient storage failure` without leaking driver detail.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use encore_engine::EngineError;
use encore_ledger::LedgerError;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// An engine operation failed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A pull-style ledger query failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The identity headers were missing or unparseable.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The caller's role does not permit the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A request payload failed validation.
    #[error("invalid request: {0}")]
    Validation(String),
}

impl ApiError {
    /// The HTTP status this error maps to.
    fn status(&self) -> StatusCode {
        match self {
            Self::Engine(e) => match e {
                EngineError::NoItems
                | EngineError::InvalidDuration
                | EngineError::NoActiveRound
                | EngineError::RoundExpired
                | EngineError::InvalidAmount
                | EngineError::BidTooLow { .. } => StatusCode::BAD_REQUEST,
                EngineError::ItemNotInRound(_) | EngineError::RoundNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                EngineError::Ledger(_) | EngineError::Catalog(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// The message shown to the caller.
    ///
    /// Storage failures are transient from the caller's perspective and
    /// deliberately opaque; everything else carries its own text.
    fn message(&self) -> String {
        match self {
            Self::Engine(EngineError::Ledger(_) | EngineError::Catalog(_)) | Self::Ledger(_) => {
                "transient storage failure, please retry".to_owned()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({
            "success": false,
            "message": self.message(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use encore_types::RoundId;

    use super::*;

    #[test]
    fn validation_errors_are_bad_request() {
        let err = ApiError::Engine(EngineError::NoActiveRound);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn missing_rounds_are_not_found() {
        let err = ApiError::Engine(EngineError::RoundNotFound(RoundId::new()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn storage_failures_are_opaque() {
        let err = ApiError::Ledger(LedgerError::Storage("connection reset".to_owned()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message().contains("connection reset"));
    }
}
