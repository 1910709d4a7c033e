//! Store domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use delicious_core::{Point, StoreId, UserId};

/// A store as persisted.
///
/// `lng`/`lat` are stored as flat columns; [`Store::location`] reassembles
/// them into a [`Point`].
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub created: DateTime<Utc>,
    pub lng: f64,
    pub lat: f64,
    pub address: String,
    pub photo: Option<String>,
    pub author: UserId,
}

impl Store {
    /// The store's geographic location.
    ///
    /// Stored coordinates were validated on the way in, so this is
    /// infallible on read.
    #[must_use]
    pub const fn location(&self) -> Point {
        Point {
            lng: self.lng,
            lat: self.lat,
        }
    }
}

/// Validated input for creating or updating a store.
///
/// Produced only by the store service's validation step; the repository
/// accepts it as-is.
#[derive(Debug, Clone)]
pub struct StoreDraft {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub location: Point,
    pub address: String,
    pub photo: Option<String>,
}

/// Reduced projection returned by the geo search API.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StorePreview {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub lng: f64,
    pub lat: f64,
    pub photo: Option<String>,
}

/// A tag with the number of stores carrying it.
#[derive(Debug, Clone, FromRow)]
pub struct TagCount {
    pub tag: String,
    pub count: i64,
}

/// A store ranked by its mean review rating.
///
/// Only stores with at least two reviews qualify.
#[derive(Debug, Clone, FromRow)]
pub struct TopStore {
    pub id: StoreId,
    pub name: String,
    pub slug: String,
    pub photo: Option<String>,
    pub review_count: i64,
    pub average_rating: f64,
}
