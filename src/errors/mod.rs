//! Error handling module for the reviewer service.
//!
//! Provides the domain error kinds with mapping to HTTP status codes and the
//! error response envelope.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::assignment::AssignmentError;

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const INVALID_INPUT: &str = "INVALID_INPUT";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const TEAM_EXISTS: &str = "TEAM_EXISTS";
    pub const PR_EXISTS: &str = "PR_EXISTS";
    pub const PR_MERGED: &str = "PR_MERGED";
    pub const NOT_ASSIGNED: &str = "NOT_ASSIGNED";
    pub const NO_CANDIDATE: &str = "NO_CANDIDATE";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Application error type.
///
/// Every variant carries a detail message for logs. Clients only ever see the
/// code and the fixed text from [`AppError::public_message`].
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Required field missing or empty, or malformed body
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Referenced entity absent
    #[error("not found: {0}")]
    NotFound(String),
    /// Team name collision
    #[error("team exists: {0}")]
    TeamExists(String),
    /// Pull request id collision
    #[error("pull request exists: {0}")]
    PrExists(String),
    /// Mutation attempted on a merged pull request
    #[error("pull request merged: {0}")]
    PrMerged(String),
    /// Reassignment of a user who is not a reviewer
    #[error("reviewer not assigned: {0}")]
    NotAssigned(String),
    /// Reassignment with an empty candidate pool
    #[error("no candidate: {0}")]
    NoCandidate(String),
    /// Store failure
    #[error("database error: {0}")]
    Database(String),
    /// Anything else
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::TeamExists(_) => StatusCode::BAD_REQUEST,
            AppError::PrExists(_) => StatusCode::CONFLICT,
            AppError::PrMerged(_) => StatusCode::CONFLICT,
            AppError::NotAssigned(_) => StatusCode::CONFLICT,
            AppError::NoCandidate(_) => StatusCode::CONFLICT,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => codes::INVALID_INPUT,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::TeamExists(_) => codes::TEAM_EXISTS,
            AppError::PrExists(_) => codes::PR_EXISTS,
            AppError::PrMerged(_) => codes::PR_MERGED,
            AppError::NotAssigned(_) => codes::NOT_ASSIGNED,
            AppError::NoCandidate(_) => codes::NO_CANDIDATE,
            AppError::Database(_) | AppError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Fixed client-facing message for this error kind.
    pub fn public_message(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "Invalid input data",
            AppError::NotFound(_) => "Resource not found",
            AppError::TeamExists(_) => "Team already exists",
            AppError::PrExists(_) => "PR already exists",
            AppError::PrMerged(_) => "Cannot modify merged PR",
            AppError::NotAssigned(_) => "Reviewer not assigned",
            AppError::NoCandidate(_) => "No available candidates",
            AppError::Database(_) | AppError::Internal(_) => "Internal server error",
        }
    }

    /// Prefix the detail message with `context`, keeping the error kind.
    pub fn context(self, context: &str) -> Self {
        let wrap = |msg: String| format!("{}: {}", context, msg);
        match self {
            AppError::InvalidInput(msg) => AppError::InvalidInput(wrap(msg)),
            AppError::NotFound(msg) => AppError::NotFound(wrap(msg)),
            AppError::TeamExists(msg) => AppError::TeamExists(wrap(msg)),
            AppError::PrExists(msg) => AppError::PrExists(wrap(msg)),
            AppError::PrMerged(msg) => AppError::PrMerged(wrap(msg)),
            AppError::NotAssigned(msg) => AppError::NotAssigned(wrap(msg)),
            AppError::NoCandidate(msg) => AppError::NoCandidate(wrap(msg)),
            AppError::Database(msg) => AppError::Database(wrap(msg)),
            AppError::Internal(msg) => AppError::Internal(wrap(msg)),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON error: {}", err))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<AssignmentError> for AppError {
    fn from(err: AssignmentError) -> Self {
        match err {
            AssignmentError::NotAssigned { .. } => AppError::NotAssigned(err.to_string()),
            AssignmentError::NoCandidate { .. } => AppError::NoCandidate(err.to_string()),
        }
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
    pub error: ErrorDetails,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        Self {
            error: ErrorDetails {
                code: error.error_code().to_string(),
                message: error.public_message().to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "unexpected error");
        }
        (status, Json(ErrorResponse::new(&self))).into_response()
    }
}
