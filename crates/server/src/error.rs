//! Application error types.
//!
//! Every error renders as the same JSON shape as a successful upload, with
//! `success: false` and a human-readable message.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::file::StorageError;
use crate::routes::upload::UploadResponse;

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    /// The `pinCode` field did not match the configured PIN.
    #[error("incorrect security code")]
    Unauthorized,

    /// No `imageFile` part was sent.
    #[error("no file sent")]
    NoFile,

    #[error("file too large (max {limit} bytes)")]
    PayloadTooLarge { limit: usize },

    /// The multipart body could not be read.
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("storage error")]
    Storage(#[from] StorageError),

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NoFile | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Details of server-side failures go to the log, not the client.
        let message = match &self {
            AppError::Storage(e) => {
                tracing::error!(error = %e, "storage error");
                "internal server error".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal server error");
                "internal server error".to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(UploadResponse::failure(message))).into_response()
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_client_messages() {
        assert_eq!(
            AppError::Unauthorized.to_string(),
            "incorrect security code"
        );
        assert_eq!(AppError::NoFile.to_string(), "no file sent");
        assert_eq!(
            AppError::PayloadTooLarge { limit: 10 }.to_string(),
            "file too large (max 10 bytes)"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::NoFile.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::PayloadTooLarge { limit: 1 }.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            AppError::Storage(StorageError::NameExhausted).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let response = AppError::Internal(anyhow::anyhow!("disk on fire")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
