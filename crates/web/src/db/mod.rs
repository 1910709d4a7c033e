//! Database access for the `PostgreSQL` backing store.
//!
//! # Tables
//!
//! - `app_user` - registered users, password hashes, reset-token fields
//! - `store` - store listings with tags, location, and photo reference
//! - `review` - reviews referencing a store and an author
//! - `heart` - user/store favourites relation
//! - tower-sessions' own session table (created by the session store)
//!
//! Migrations live in `crates/web/migrations/` and are embedded at compile
//! time via [`MIGRATOR`]; the server runs them on startup.

pub mod reviews;
pub mod stores;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

/// Embedded migrations for the application schema.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Errors from the repository layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// Acquire timeout is explicit: database calls must not hang a request
/// indefinitely.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
