//! Review domain types.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use delicious_core::{ReviewId, StoreId, UserId};

/// A review of a store.
#[derive(Debug, Clone, FromRow)]
pub struct Review {
    pub id: ReviewId,
    pub store_id: StoreId,
    pub author: UserId,
    pub text: String,
    pub rating: i32,
    pub created: DateTime<Utc>,
}

/// A review joined with its author's display name, for the detail page.
#[derive(Debug, Clone, FromRow)]
pub struct ReviewWithAuthor {
    pub id: ReviewId,
    pub author_name: String,
    pub text: String,
    pub rating: i32,
    pub created: DateTime<Utc>,
}
