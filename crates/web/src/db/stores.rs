//! Store repository for database operations.
//!
//! All aggregate queries (tag counts, top-rated ranking, geo search,
//! full-text search) are expressed in SQL; the service layer above stays
//! agnostic to where the aggregation runs.

use sqlx::PgPool;

use delicious_core::{StoreId, UserId};

use super::RepositoryError;
use crate::models::{Store, StoreDraft, StorePreview, TagCount, TopStore};

/// Columns selected for a full [`Store`] row.
const STORE_COLUMNS: &str = "id, name, slug, description, tags, created, lng, lat, address, photo, author";

/// Haversine distance in meters between a bound point (`$1` = lng, `$2` = lat)
/// and each row's coordinates. Clamped so floating-point noise never leaves
/// the domain of `acos`.
const DISTANCE_METERS: &str = "6371000.0 * acos(least(1.0, greatest(-1.0, \
     cos(radians($2)) * cos(radians(lat)) * cos(radians(lng) - radians($1)) \
   + sin(radians($2)) * sin(radians(lat)))))";

/// Repository for store database operations.
pub struct StoreRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StoreRepository<'a> {
    /// Create a new store repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is already taken
    /// (two concurrent creations can race to the same suffix).
    pub async fn insert(
        &self,
        draft: &StoreDraft,
        author: UserId,
    ) -> Result<Store, RepositoryError> {
        let sql = format!(
            "INSERT INTO store (name, slug, description, tags, lng, lat, address, photo, author) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {STORE_COLUMNS}"
        );

        sqlx::query_as::<_, Store>(&sql)
            .bind(&draft.name)
            .bind(&draft.slug)
            .bind(&draft.description)
            .bind(&draft.tags)
            .bind(draft.location.lng)
            .bind(draft.location.lat)
            .bind(&draft.address)
            .bind(&draft.photo)
            .bind(author)
            .fetch_one(self.pool)
            .await
            .map_err(conflict_on_unique_violation)
    }

    /// Update an existing store.
    ///
    /// A `None` photo keeps the previously stored photo; photos are never
    /// cleared through this path.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store doesn't exist.
    pub async fn update(&self, id: StoreId, draft: &StoreDraft) -> Result<Store, RepositoryError> {
        let sql = format!(
            "UPDATE store \
             SET name = $2, slug = $3, description = $4, tags = $5, \
                 lng = $6, lat = $7, address = $8, photo = COALESCE($9, photo) \
             WHERE id = $1 \
             RETURNING {STORE_COLUMNS}"
        );

        sqlx::query_as::<_, Store>(&sql)
            .bind(id)
            .bind(&draft.name)
            .bind(&draft.slug)
            .bind(&draft.description)
            .bind(&draft.tags)
            .bind(draft.location.lng)
            .bind(draft.location.lat)
            .bind(&draft.address)
            .bind(&draft.photo)
            .fetch_optional(self.pool)
            .await
            .map_err(conflict_on_unique_violation)?
            .ok_or(RepositoryError::NotFound)
    }

    /// Get a store by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let sql = format!("SELECT {STORE_COLUMNS} FROM store WHERE id = $1");
        Ok(sqlx::query_as::<_, Store>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?)
    }

    /// Get a store by its slug (exact match).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Store>, RepositoryError> {
        let sql = format!("SELECT {STORE_COLUMNS} FROM store WHERE slug = $1");
        Ok(sqlx::query_as::<_, Store>(&sql)
            .bind(slug)
            .fetch_optional(self.pool)
            .await?)
    }

    /// All slugs colliding with `base`: the base itself or `base-<n>`,
    /// case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn slugs_matching(&self, base: &str) -> Result<Vec<String>, RepositoryError> {
        let slugs = sqlx::query_scalar::<_, String>(
            "SELECT slug FROM store \
             WHERE lower(slug) = lower($1) OR slug ~* ('^' || $1 || '-[0-9]+$')",
        )
        .bind(base)
        .fetch_all(self.pool)
        .await?;
        Ok(slugs)
    }

    /// One page of stores, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_page(&self, limit: i64, offset: i64) -> Result<Vec<Store>, RepositoryError> {
        let sql = format!(
            "SELECT {STORE_COLUMNS} FROM store ORDER BY created DESC LIMIT $1 OFFSET $2"
        );
        Ok(sqlx::query_as::<_, Store>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool)
            .await?)
    }

    /// Total number of stores.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM store")
            .fetch_one(self.pool)
            .await?)
    }

    /// Stores carrying `tag`, or every store with at least one tag when
    /// `tag` is `None`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_tag(&self, tag: Option<&str>) -> Result<Vec<Store>, RepositoryError> {
        let stores = match tag {
            Some(tag) => {
                let sql = format!(
                    "SELECT {STORE_COLUMNS} FROM store WHERE $1 = ANY(tags) ORDER BY created DESC"
                );
                sqlx::query_as::<_, Store>(&sql)
                    .bind(tag)
                    .fetch_all(self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {STORE_COLUMNS} FROM store WHERE cardinality(tags) > 0 \
                     ORDER BY created DESC"
                );
                sqlx::query_as::<_, Store>(&sql).fetch_all(self.pool).await?
            }
        };
        Ok(stores)
    }

    /// Distinct tags with per-tag store counts, most used first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn tag_counts(&self) -> Result<Vec<TagCount>, RepositoryError> {
        let counts = sqlx::query_as::<_, TagCount>(
            "SELECT t.tag, COUNT(*) AS count \
             FROM store s, unnest(s.tags) AS t(tag) \
             GROUP BY t.tag \
             ORDER BY count DESC, t.tag ASC",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(counts)
    }

    /// Full-text search over name and description, ranked by relevance.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search_text(&self, query: &str, limit: i64) -> Result<Vec<Store>, RepositoryError> {
        let sql = format!(
            "SELECT {STORE_COLUMNS} FROM store \
             WHERE to_tsvector('english', name || ' ' || coalesce(description, '')) \
                   @@ plainto_tsquery('english', $1) \
             ORDER BY ts_rank(to_tsvector('english', name || ' ' || coalesce(description, '')), \
                              plainto_tsquery('english', $1)) DESC \
             LIMIT $2"
        );
        Ok(sqlx::query_as::<_, Store>(&sql)
            .bind(query)
            .bind(limit)
            .fetch_all(self.pool)
            .await?)
    }

    /// Stores within `max_distance_meters` of a point, nearest first,
    /// projected to the preview field set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search_near(
        &self,
        lng: f64,
        lat: f64,
        max_distance_meters: f64,
    ) -> Result<Vec<StorePreview>, RepositoryError> {
        let sql = format!(
            "SELECT slug, name, description, lng, lat, photo FROM store \
             WHERE {DISTANCE_METERS} <= $3 \
             ORDER BY {DISTANCE_METERS} ASC"
        );
        Ok(sqlx::query_as::<_, StorePreview>(&sql)
            .bind(lng)
            .bind(lat)
            .bind(max_distance_meters)
            .fetch_all(self.pool)
            .await?)
    }

    /// Top stores by mean rating; only stores with at least two reviews
    /// qualify.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn top_rated(&self, limit: i64) -> Result<Vec<TopStore>, RepositoryError> {
        let top = sqlx::query_as::<_, TopStore>(
            "SELECT s.id, s.name, s.slug, s.photo, \
                    COUNT(r.id) AS review_count, \
                    AVG(r.rating)::float8 AS average_rating \
             FROM store s \
             JOIN review r ON r.store_id = s.id \
             GROUP BY s.id, s.name, s.slug, s.photo \
             HAVING COUNT(r.id) >= 2 \
             ORDER BY average_rating DESC \
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(top)
    }

    /// Number of users who hearted a store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn heart_count(&self, id: StoreId) -> Result<i64, RepositoryError> {
        Ok(
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM heart WHERE store_id = $1")
                .bind(id)
                .fetch_one(self.pool)
                .await?,
        )
    }
}

/// Map a unique-constraint violation to `RepositoryError::Conflict`.
fn conflict_on_unique_violation(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict("slug already exists".to_owned());
    }
    RepositoryError::Database(e)
}
