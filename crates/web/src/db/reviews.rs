//! Review repository for database operations.

use sqlx::PgPool;

use delicious_core::{StoreId, UserId};

use super::RepositoryError;
use crate::models::{Review, ReviewWithAuthor};

/// Repository for review database operations.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a review for a store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails (including
    /// a rating outside the 1-5 check constraint).
    pub async fn insert(
        &self,
        store: StoreId,
        author: UserId,
        text: &str,
        rating: i32,
    ) -> Result<Review, RepositoryError> {
        let review = sqlx::query_as::<_, Review>(
            "INSERT INTO review (store_id, author, text, rating) VALUES ($1, $2, $3, $4) \
             RETURNING id, store_id, author, text, rating, created",
        )
        .bind(store)
        .bind(author)
        .bind(text)
        .bind(rating)
        .fetch_one(self.pool)
        .await?;
        Ok(review)
    }

    /// All reviews for a store with author names, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_store(
        &self,
        store: StoreId,
    ) -> Result<Vec<ReviewWithAuthor>, RepositoryError> {
        let reviews = sqlx::query_as::<_, ReviewWithAuthor>(
            "SELECT r.id, u.name AS author_name, r.text, r.rating, r.created \
             FROM review r \
             JOIN app_user u ON u.id = r.author \
             WHERE r.store_id = $1 \
             ORDER BY r.created DESC",
        )
        .bind(store)
        .fetch_all(self.pool)
        .await?;
        Ok(reviews)
    }
}
