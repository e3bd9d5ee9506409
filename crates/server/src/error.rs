//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hangar_metadata::MetadataError;

/// API error type.
///
/// Every variant is scoped to one request; nothing here is fatal to the
/// process. `Metadata` is the storage-failure class and the only one a
/// client should blindly retry: the affected session is guaranteed to be
/// in its pre-transaction state.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("account is not verified")]
    Unverified,

    #[error("download cooldown active, retry in {remaining_secs}s")]
    CooldownActive { remaining_secs: u64 },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid or already processed token")]
    InvalidToken,

    #[error("size mismatch: observed {observed} of expected {expected} bytes")]
    SizeMismatch { observed: u64, expected: u64 },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("storage failure: {0}")]
    Metadata(#[from] MetadataError),

    #[error("core error: {0}")]
    Core(#[from] hangar_core::Error),
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Unverified => "unverified",
            Self::CooldownActive { .. } => "cooldown_active",
            Self::NotFound(_) => "not_found",
            Self::InvalidToken => "invalid_token",
            Self::SizeMismatch { .. } => "size_mismatch",
            Self::Forbidden(_) => "forbidden",
            Self::BadRequest(_) => "bad_request",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "internal_error",
            Self::Metadata(e) => match e {
                MetadataError::NotFound(_) => "not_found",
                MetadataError::AlreadyExists(_) => "conflict",
                _ => "storage_failure",
            },
            Self::Core(_) => "bad_request",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Unverified => StatusCode::FORBIDDEN,
            Self::CooldownActive { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            // Not a retry invitation: the conflict is with the
            // session's already-resolved state.
            Self::InvalidToken => StatusCode::CONFLICT,
            Self::SizeMismatch { .. } => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Metadata(e) => match e {
                MetadataError::NotFound(_) => StatusCode::NOT_FOUND,
                MetadataError::AlreadyExists(_) => StatusCode::CONFLICT,
                MetadataError::Constraint(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Core(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut body = serde_json::json!({
            "code": self.code(),
            "message": self.to_string(),
        });

        // Variants carrying structured data expose it so clients can act
        // on it without parsing the message.
        match &self {
            Self::CooldownActive { remaining_secs } => {
                body["retry_after_secs"] = serde_json::json!(remaining_secs);
            }
            Self::SizeMismatch { observed, expected } => {
                body["observed"] = serde_json::json!(observed);
                body["expected"] = serde_json::json!(expected);
            }
            _ => {}
        }

        if let Self::CooldownActive { remaining_secs } = &self {
            return (
                status,
                [("Retry-After", remaining_secs.to_string())],
                Json(body),
            )
                .into_response();
        }

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
