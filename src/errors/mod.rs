//! Error handling module for the reviewer service.
//!
//! Provides the domain error taxonomy with mapping to HTTP status codes and response envelopes.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const TEAM_EXISTS: &str = "TEAM_EXISTS";
    pub const PR_EXISTS: &str = "PR_EXISTS";
    pub const PR_MERGED: &str = "PR_MERGED";
    pub const NOT_ASSIGNED: &str = "NOT_ASSIGNED";
    pub const NO_CANDIDATE: &str = "NO_CANDIDATE";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const INTERNAL: &str = "INTERNAL";
}

/// Message returned to clients for any unexpected failure.
const INTERNAL_MESSAGE: &str = "internal error";

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Team name is already taken
    #[error("team already exists")]
    TeamExists,
    /// Pull request id is already taken
    #[error("pull request already exists")]
    PrExists,
    /// Referenced team, user or pull request does not exist
    #[error("{0}")]
    NotFound(String),
    /// Mutation attempted on a merged pull request
    #[error("cannot mutate merged pull request")]
    PrMerged,
    /// Reassignment target is not a reviewer of the pull request
    #[error("reviewer is not assigned to this pull request")]
    NotAssigned,
    /// No active replacement exists in the reviewer's team
    #[error("no active replacement candidate in team")]
    NoCandidate,
    /// Request failed boundary validation
    #[error("{0}")]
    Validation(String),
    /// Database error
    #[error("database error: {0}")]
    Database(String),
    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::TeamExists => StatusCode::BAD_REQUEST,
            AppError::PrExists => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PrMerged => StatusCode::CONFLICT,
            AppError::NotAssigned => StatusCode::CONFLICT,
            AppError::NoCandidate => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::TeamExists => codes::TEAM_EXISTS,
            AppError::PrExists => codes::PR_EXISTS,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::PrMerged => codes::PR_MERGED,
            AppError::NotAssigned => codes::NOT_ASSIGNED,
            AppError::NoCandidate => codes::NO_CANDIDATE,
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::Database(_) => codes::INTERNAL,
            AppError::Internal(_) => codes::INTERNAL,
        }
    }

    /// Get the client-facing message. Internal details never leave the process.
    pub fn message(&self) -> String {
        match self {
            AppError::Database(_) | AppError::Internal(_) => INTERNAL_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    pub fn not_found(what: &str) -> Self {
        AppError::NotFound(format!("{} not found", what))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AppError::Database(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        let message = match rejection {
            JsonRejection::JsonDataError(_) => "request body has missing or mistyped fields",
            JsonRejection::JsonSyntaxError(_) => "request body is not valid JSON",
            JsonRejection::MissingJsonContentType(_) => {
                "request body must be sent as application/json"
            }
            _ => "request body could not be read",
        };
        AppError::Validation(message.to_string())
    }
}

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        Self {
            success: false,
            error: ErrorDetails {
                code: error.error_code().to_string(),
                message: error.message(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse::new(&self);
        (status, Json(body)).into_response()
    }
}
