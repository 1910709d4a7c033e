//! User repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use delicious_core::{Email, StoreId, UserId};

use super::RepositoryError;
use crate::models::{Store, User};

const USER_COLUMNS: &str = "id, email, name, created_at";

/// Internal row for reset-token lookups; the expiry is checked by the
/// identity service, not hidden inside SQL.
#[derive(FromRow)]
struct UserWithResetExpiry {
    id: UserId,
    email: Email,
    name: String,
    created_at: DateTime<Utc>,
    reset_password_expires: Option<DateTime<Utc>>,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user with a hashed password.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    pub async fn create(
        &self,
        email: &Email,
        name: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let sql = format!(
            "INSERT INTO app_user (email, name, password_hash) VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .bind(name)
            .bind(password_hash)
            .fetch_one(self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_unique_violation()
                {
                    return RepositoryError::Conflict("email already exists".to_owned());
                }
                RepositoryError::Database(e)
            })
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM app_user WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?)
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM app_user WHERE email = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(self.pool)
            .await?)
    }

    /// Get a user together with their password hash, for credential checks.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        #[derive(FromRow)]
        struct Row {
            id: UserId,
            email: Email,
            name: String,
            created_at: DateTime<Utc>,
            password_hash: String,
        }

        let row = sqlx::query_as::<_, Row>(
            "SELECT id, email, name, created_at, password_hash FROM app_user WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|r| {
            (
                User {
                    id: r.id,
                    email: r.email,
                    name: r.name,
                    created_at: r.created_at,
                },
                r.password_hash,
            )
        }))
    }

    /// Store a password-reset token with its expiry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn set_reset_token(
        &self,
        id: UserId,
        token: &str,
        expires: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE app_user SET reset_password_token = $2, reset_password_expires = $3 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(token)
        .bind(expires)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Find the user holding a reset token, along with its expiry.
    ///
    /// The token may already be expired; the caller decides.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if a stored token has no
    /// expiry.
    pub async fn get_by_reset_token(
        &self,
        token: &str,
    ) -> Result<Option<(User, DateTime<Utc>)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithResetExpiry>(
            "SELECT id, email, name, created_at, reset_password_expires \
             FROM app_user WHERE reset_password_token = $1",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(r) => {
                let expires = r.reset_password_expires.ok_or_else(|| {
                    RepositoryError::DataCorruption("reset token without expiry".to_owned())
                })?;
                Ok(Some((
                    User {
                        id: r.id,
                        email: r.email,
                        name: r.name,
                        created_at: r.created_at,
                    },
                    expires,
                )))
            }
            None => Ok(None),
        }
    }

    /// Replace the password hash and clear both reset fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn set_password(&self, id: UserId, password_hash: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE app_user SET password_hash = $2, \
             reset_password_token = NULL, reset_password_expires = NULL \
             WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Update a user's display name and email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the new email is taken.
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn update_profile(
        &self,
        id: UserId,
        name: &str,
        email: &Email,
    ) -> Result<User, RepositoryError> {
        let sql = format!(
            "UPDATE app_user SET name = $2, email = $3 WHERE id = $1 RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(name)
            .bind(email)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_unique_violation()
                {
                    return RepositoryError::Conflict("email already exists".to_owned());
                }
                RepositoryError::Database(e)
            })?
            .ok_or(RepositoryError::NotFound)
    }

    /// Toggle a heart on a store and return the user's updated heart set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction fails.
    pub async fn toggle_heart(
        &self,
        user: UserId,
        store: StoreId,
    ) -> Result<Vec<StoreId>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM heart WHERE user_id = $1 AND store_id = $2")
            .bind(user)
            .bind(store)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            sqlx::query("INSERT INTO heart (user_id, store_id) VALUES ($1, $2)")
                .bind(user)
                .bind(store)
                .execute(&mut *tx)
                .await?;
        }

        let hearts = sqlx::query_scalar::<_, StoreId>(
            "SELECT store_id FROM heart WHERE user_id = $1 ORDER BY store_id",
        )
        .bind(user)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(hearts)
    }

    /// IDs of the stores a user has hearted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn hearts(&self, user: UserId) -> Result<Vec<StoreId>, RepositoryError> {
        Ok(sqlx::query_scalar::<_, StoreId>(
            "SELECT store_id FROM heart WHERE user_id = $1 ORDER BY store_id",
        )
        .bind(user)
        .fetch_all(self.pool)
        .await?)
    }

    /// The stores a user has hearted, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn hearted_stores(&self, user: UserId) -> Result<Vec<Store>, RepositoryError> {
        let stores = sqlx::query_as::<_, Store>(
            "SELECT s.id, s.name, s.slug, s.description, s.tags, s.created, \
                    s.lng, s.lat, s.address, s.photo, s.author \
             FROM store s \
             JOIN heart h ON h.store_id = s.id \
             WHERE h.user_id = $1 \
             ORDER BY s.created DESC",
        )
        .bind(user)
        .fetch_all(self.pool)
        .await?;
        Ok(stores)
    }
}
