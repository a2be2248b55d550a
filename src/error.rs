//! Error types for the lending inventory

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable numeric error codes reported to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    StoreFailure = 3,
    NoSuchBook = 4,
    BookNotAvailable = 5,
    Duplicate = 6,
    BadValue = 7,
    InvalidCredentials = 8,
    InvalidQuantity = 9,
    NoOpenLoan = 10,
    BookHasOpenLoans = 11,
}

/// Persistence failures, not further interpreted by the core
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Backend(String),
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("User already exists: {0}")]
    DuplicateUser(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Operation not permitted")]
    NotAuthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not available: {0}")]
    Unavailable(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("No open loan: {0}")]
    NoOpenLoan(String),

    #[error("Loans outstanding: {0}")]
    LoansOutstanding(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Missing or unusable bearer token on the HTTP surface
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Store(StoreError::Database(e))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, ErrorCode) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue),
            AppError::DuplicateUser(_) => (StatusCode::CONFLICT, ErrorCode::Duplicate),
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, ErrorCode::InvalidCredentials)
            }
            AppError::NotAuthorized => (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchBook),
            AppError::Unavailable(_) => (StatusCode::CONFLICT, ErrorCode::BookNotAvailable),
            AppError::InvalidQuantity(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::InvalidQuantity)
            }
            AppError::NoOpenLoan(_) => (StatusCode::CONFLICT, ErrorCode::NoOpenLoan),
            AppError::LoansOutstanding(_) => (StatusCode::CONFLICT, ErrorCode::BookHasOpenLoans),
            AppError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::StoreFailure),
            AppError::Authentication(_) => (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Failure),
        }
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            AppError::Store(e) => {
                tracing::error!("Store error: {:?}", e);
                "Store error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_authorized_does_not_explain() {
        assert_eq!(AppError::NotAuthorized.to_string(), "Operation not permitted");
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            AppError::Unavailable("x".into()).status_and_code(),
            (StatusCode::CONFLICT, ErrorCode::BookNotAvailable)
        );
        assert_eq!(
            AppError::InvalidCredentials.status_and_code().0,
            StatusCode::UNAUTHORIZED
        );
        let store = AppError::Store(StoreError::Backend("down".into()));
        assert_eq!(store.status_and_code().1, ErrorCode::StoreFailure);
    }
}
