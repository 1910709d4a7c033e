//! Identity error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during identity operations.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Input failed validation; every violated rule is listed.
    #[error("validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),

    /// Wrong email or password. Deliberately does not say which.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Email is already registered.
    #[error("email already registered")]
    EmailTaken,

    /// Password reset token is unknown or expired.
    #[error("password reset token is invalid or has expired")]
    TokenInvalid,

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
