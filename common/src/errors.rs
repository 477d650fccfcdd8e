//! Application error type.
//!
//! Every fallible operation returns [`AppResult`]. Errors render as the
//! standard JSON envelope with a status code chosen per variant.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::response::ApiResponse;

/// Result alias used across the workspace.
pub type AppResult<T> = Result<T, AppError>;

/// Application error.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request parameters failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// A replay token was malformed, forged, or failed to decode.
    #[error("invalid query token: {0}")]
    InvalidQueryToken(String),

    /// A replay token decoded to a statement that is not a SELECT.
    #[error("only SELECT statements can be replayed")]
    NotSelectStatement,

    /// The database extension is not registered on the application.
    #[error("database extension is not registered")]
    ExtensionNotRegistered,

    /// Could not connect to the database.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// A statement failed to execute.
    #[error("database query error: {0}")]
    DatabaseQuery(String),

    /// A value could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidQueryToken(_) | AppError::NotSelectStatement => {
                StatusCode::NOT_ACCEPTABLE
            }
            AppError::DatabaseConnection(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ExtensionNotRegistered
            | AppError::DatabaseQuery(_)
            | AppError::Serialization(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::InvalidQueryToken(_) => "INVALID_QUERY_TOKEN",
            AppError::NotSelectStatement => "NOT_SELECT_STATEMENT",
            AppError::ExtensionNotRegistered => "EXTENSION_NOT_REGISTERED",
            AppError::DatabaseConnection(_) => "DATABASE_CONNECTION_ERROR",
            AppError::DatabaseQuery(_) => "DATABASE_QUERY_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        } else {
            tracing::warn!(code = self.code(), error = %self, "request rejected");
        }

        let body = ApiResponse::err(self.code(), self.to_string());
        (status, Json(body)).into_response()
    }
}
