//! User domain types.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use delicious_core::{Email, UserId};

/// A registered user.
///
/// The password hash and reset-token fields are deliberately absent; the
/// repository exposes them only through dedicated queries.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
