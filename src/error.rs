//! Error types shared by the memory store and the HTTP layer.
//!
//! [`MemoryError`] carries the failures callers need to tell apart; everything
//! else travels as `anyhow::Error`. [`ApiError`] maps both onto HTTP status
//! codes with a uniform `{"error": message}` body.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_typed_multipart::TypedMultipartError;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("memory index not found at {}", .0.display())]
    IndexMissing(PathBuf),

    #[error("archive '{0}' has already been ingested")]
    DuplicateArchive(String),

    #[error("invalid zip archive: {0}")]
    InvalidArchive(String),

    #[error("archive '{0}' contains no readable text")]
    EmptyArchive(String),

    #[error("Missing query")]
    EmptyQuery,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Map an extractor rejection onto a client error with the same status class.
    fn rejected(status: StatusCode, message: String) -> Self {
        tracing::debug!(%status, error = %message, "request rejected");
        match status {
            StatusCode::PAYLOAD_TOO_LARGE => Self::PayloadTooLarge(message),
            s if s.is_server_error() => Self::Internal(message),
            _ => Self::Validation(message),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<TypedMultipartError> for ApiError {
    fn from(err: TypedMultipartError) -> Self {
        Self::rejected(err.get_status(), err.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(memory_err) = err.downcast_ref::<MemoryError>() {
            let message = memory_err.to_string();
            return match memory_err {
                MemoryError::IndexMissing(_) => Self::NotFound(message),
                MemoryError::DuplicateArchive(_) => Self::Conflict(message),
                MemoryError::InvalidArchive(_)
                | MemoryError::EmptyArchive(_)
                | MemoryError::EmptyQuery => Self::Validation(message),
            };
        }
        tracing::error!(error = %format!("{err:#}"), "request failed");
        Self::Internal(format!("{err:#}"))
    }
}

#[derive(Serialize, Debug)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
