//! Store service.
//!
//! CRUD and query operations over stores: validation, slug assignment,
//! ownership checks, pagination, and the aggregate views (tags, top-rated,
//! text and geo search). Slug generation is an explicit service step rather
//! than a storage-layer hook.

use sqlx::PgPool;
use thiserror::Error;

use delicious_core::{Point, PointError, StoreId, UserId};

use crate::db::RepositoryError;
use crate::db::reviews::ReviewRepository;
use crate::db::stores::StoreRepository;
use crate::db::users::UserRepository;
use crate::models::{
    Review, ReviewWithAuthor, Store, StoreDraft, StorePreview, TagCount, TopStore,
};

/// Stores shown per listing page.
pub const PAGE_SIZE: i64 = 3;

/// Result limit for text search.
pub const SEARCH_LIMIT: i64 = 5;

/// Radius for geo search, in meters.
pub const NEAR_DISTANCE_METERS: f64 = 10_000.0;

/// Result limit for the top-rated ranking.
pub const TOP_LIMIT: i64 = 10;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Input failed validation; every violated rule is listed.
    #[error("validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),

    /// Store does not exist.
    #[error("store not found")]
    NotFound,

    /// The requester is not the store's author.
    #[error("you must own a store in order to edit it")]
    NotOwner,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Raw store form input, as submitted.
///
/// Coordinates arrive already parsed; a field that was missing or not a
/// number is `None` and fails validation.
#[derive(Debug, Clone, Default)]
pub struct StoreInput {
    pub name: String,
    pub description: String,
    pub address: String,
    pub lng: Option<f64>,
    pub lat: Option<f64>,
    pub tags: Vec<String>,
    /// Filename already produced by the media adapter, if a photo was uploaded.
    pub photo: Option<String>,
}

/// One page of the store listing.
#[derive(Debug, Clone)]
pub struct StorePage {
    pub stores: Vec<Store>,
    pub page: i64,
    pub pages: i64,
    pub count: i64,
}

/// A store detail view: the store plus its populated relationships.
#[derive(Debug, Clone)]
pub struct StoreDetail {
    pub store: Store,
    pub author_name: String,
    pub reviews: Vec<ReviewWithAuthor>,
    pub hearts: i64,
}

/// Store service.
pub struct StoreService<'a> {
    stores: StoreRepository<'a>,
    reviews: ReviewRepository<'a>,
    users: UserRepository<'a>,
}

impl<'a> StoreService<'a> {
    /// Create a new store service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            stores: StoreRepository::new(pool),
            reviews: ReviewRepository::new(pool),
            users: UserRepository::new(pool),
        }
    }

    /// Create a store owned by `author`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` listing every violated rule.
    pub async fn create(&self, input: StoreInput, author: UserId) -> Result<Store, StoreError> {
        let validated = validate_store_input(&input)?;

        let base = slugify(&validated.name);
        let colliding = self.stores.slugs_matching(&base).await?;
        let slug = dedupe_slug(&base, colliding.len());

        let draft = StoreDraft {
            name: validated.name,
            slug,
            description: validated.description,
            tags: validated.tags,
            location: validated.location,
            address: validated.address,
            photo: input.photo,
        };

        let store = self.stores.insert(&draft, author).await?;
        Ok(store)
    }

    /// Update a store.
    ///
    /// All fields are re-validated; the slug is regenerated only when the
    /// name actually changed. The ownership check runs before anything is
    /// written, so a rejected update leaves the store untouched.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the store is absent,
    /// `StoreError::NotOwner` if `requester` is not the author, or
    /// `StoreError::Validation` on bad input.
    pub async fn update(
        &self,
        id: StoreId,
        input: StoreInput,
        requester: UserId,
    ) -> Result<Store, StoreError> {
        let existing = self.stores.get_by_id(id).await?.ok_or(StoreError::NotFound)?;
        confirm_owner(&existing, requester)?;

        let validated = validate_store_input(&input)?;

        let slug = if validated.name == existing.name {
            existing.slug.clone()
        } else {
            let base = slugify(&validated.name);
            let colliding = self.stores.slugs_matching(&base).await?;
            dedupe_slug(&base, colliding.len())
        };

        let draft = StoreDraft {
            name: validated.name,
            slug,
            description: validated.description,
            tags: validated.tags,
            location: validated.location,
            address: validated.address,
            photo: input.photo,
        };

        let store = self.stores.update(id, &draft).await?;
        Ok(store)
    }

    /// Load a store for editing, checking ownership first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` or `StoreError::NotOwner`.
    pub async fn get_for_edit(&self, id: StoreId, requester: UserId) -> Result<Store, StoreError> {
        let store = self.stores.get_by_id(id).await?.ok_or(StoreError::NotFound)?;
        confirm_owner(&store, requester)?;
        Ok(store)
    }

    /// Detail view by slug: store, author name, reviews, heart count.
    ///
    /// `None` means the caller should fall through to its not-found page.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if a query fails.
    pub async fn get_detail(&self, slug: &str) -> Result<Option<StoreDetail>, StoreError> {
        let Some(store) = self.stores.get_by_slug(slug).await? else {
            return Ok(None);
        };

        let author_name = self
            .users
            .get_by_id(store.author)
            .await?
            .map(|u| u.name)
            .unwrap_or_default();
        let reviews = self.reviews.list_for_store(store.id).await?;
        let hearts = self.stores.heart_count(store.id).await?;

        Ok(Some(StoreDetail {
            store,
            author_name,
            reviews,
            hearts,
        }))
    }

    /// One page of stores, newest first. Page numbers start at 1.
    ///
    /// Callers should redirect to the last page when `page > pages` and
    /// results exist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if a query fails.
    pub async fn list_paged(&self, page: i64) -> Result<StorePage, StoreError> {
        let page = page.max(1);
        let count = self.stores.count().await?;
        let pages = page_count(count, PAGE_SIZE);
        let offset = (page - 1) * PAGE_SIZE;
        let stores = self.stores.list_page(PAGE_SIZE, offset).await?;

        Ok(StorePage {
            stores,
            page,
            pages,
            count,
        })
    }

    /// Stores carrying `tag` (or any tag at all when `None`), plus the
    /// distinct tag list with counts.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if a query fails.
    pub async fn list_by_tag(
        &self,
        tag: Option<&str>,
    ) -> Result<(Vec<Store>, Vec<TagCount>), StoreError> {
        let tag = tag.filter(|t| !t.is_empty());
        let stores = self.stores.list_by_tag(tag).await?;
        let tags = self.stores.tag_counts().await?;
        Ok((stores, tags))
    }

    /// Full-text search over name and description, top results by relevance.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if a query fails.
    pub async fn search_text(&self, query: &str) -> Result<Vec<Store>, StoreError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.stores.search_text(query, SEARCH_LIMIT).await?)
    }

    /// Stores within 10km of a point.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` if the coordinates are invalid.
    pub async fn search_near(&self, lng: f64, lat: f64) -> Result<Vec<StorePreview>, StoreError> {
        let point = Point::new(lng, lat)
            .map_err(|e: PointError| StoreError::Validation(vec![e.to_string()]))?;
        Ok(self
            .stores
            .search_near(point.lng, point.lat, NEAR_DISTANCE_METERS)
            .await?)
    }

    /// Top stores by mean rating (at least two reviews required).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if a query fails.
    pub async fn top_rated(&self) -> Result<Vec<TopStore>, StoreError> {
        Ok(self.stores.top_rated(TOP_LIMIT).await?)
    }

    /// Add a review to a store.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` for an empty review or a rating
    /// outside 1-5, `StoreError::NotFound` for an unknown store.
    pub async fn add_review(
        &self,
        store: StoreId,
        author: UserId,
        text: &str,
        rating: i32,
    ) -> Result<(Store, Review), StoreError> {
        let text = text.trim();
        let mut errors = Vec::new();
        if text.is_empty() {
            errors.push("Your review must have text".to_owned());
        }
        if !(1..=5).contains(&rating) {
            errors.push("Rating must be between 1 and 5".to_owned());
        }
        if !errors.is_empty() {
            return Err(StoreError::Validation(errors));
        }

        let store = self.stores.get_by_id(store).await?.ok_or(StoreError::NotFound)?;
        let review = self.reviews.insert(store.id, author, text, rating).await?;
        Ok((store, review))
    }
}

/// Fail unless `requester` authored the store.
///
/// # Errors
///
/// Returns `StoreError::NotOwner` on violation.
pub fn confirm_owner(store: &Store, requester: UserId) -> Result<(), StoreError> {
    if store.author == requester {
        Ok(())
    } else {
        Err(StoreError::NotOwner)
    }
}

/// Number of pages needed for `count` items.
#[must_use]
pub fn page_count(count: i64, page_size: i64) -> i64 {
    // `i64::div_ceil` is unstable (`int_roundings`); this matches its semantics.
    let d = count / page_size;
    let r = count % page_size;
    if (r > 0 && page_size > 0) || (r < 0 && page_size < 0) {
        d + 1
    } else {
        d
    }
}

/// Derive a URL-safe slug from a store name: lowercase, alphanumeric runs
/// joined by single hyphens.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_hyphen = true; // suppress a leading hyphen
    for c in name.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Resolve a slug collision: with `colliding` existing matches for the base
/// pattern, the new slug gets suffix `-<colliding + 1>`.
///
/// Best-effort only: the surrounding check-then-write is not atomic, so two
/// concurrent creations with the same name can race.
#[must_use]
pub fn dedupe_slug(base: &str, colliding: usize) -> String {
    if colliding == 0 {
        base.to_owned()
    } else {
        format!("{base}-{}", colliding + 1)
    }
}

/// Validated pieces of a store input.
#[derive(Debug)]
struct ValidatedStore {
    name: String,
    description: Option<String>,
    address: String,
    tags: Vec<String>,
    location: Point,
}

/// Validate raw form input, collecting every violated rule.
fn validate_store_input(input: &StoreInput) -> Result<ValidatedStore, StoreError> {
    let mut errors = Vec::new();

    let name = input.name.trim().to_owned();
    if name.is_empty() {
        errors.push("Please enter a store name".to_owned());
    }

    let address = input.address.trim().to_owned();
    if address.is_empty() {
        errors.push("You must supply an address".to_owned());
    }

    let location = match (input.lng, input.lat) {
        (Some(lng), Some(lat)) => match Point::new(lng, lat) {
            Ok(point) => Some(point),
            Err(e) => {
                errors.push(e.to_string());
                None
            }
        },
        _ => {
            errors.push("You must supply coordinates".to_owned());
            None
        }
    };

    let location = match (location, errors.is_empty()) {
        (Some(location), true) => location,
        _ => return Err(StoreError::Validation(errors)),
    };

    let description = input.description.trim();
    let description = if description.is_empty() {
        None
    } else {
        Some(description.to_owned())
    };

    let tags = input
        .tags
        .iter()
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty())
        .collect();

    Ok(ValidatedStore {
        name,
        description,
        address,
        tags,
        location,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Bar"), "bar");
        assert_eq!(slugify("Dang That's Delicious"), "dang-that-s-delicious");
        assert_eq!(slugify("  Coffee  &  Cake  "), "coffee-cake");
    }

    #[test]
    fn test_slugify_strips_edge_punctuation() {
        assert_eq!(slugify("!!Tacos!!"), "tacos");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn test_dedupe_slug_sequence() {
        // bar, bar-2, bar-3, ... as collisions accumulate
        assert_eq!(dedupe_slug("bar", 0), "bar");
        assert_eq!(dedupe_slug("bar", 1), "bar-2");
        assert_eq!(dedupe_slug("bar", 2), "bar-3");
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, PAGE_SIZE), 0);
        assert_eq!(page_count(1, PAGE_SIZE), 1);
        assert_eq!(page_count(3, PAGE_SIZE), 1);
        assert_eq!(page_count(4, PAGE_SIZE), 2);
        assert_eq!(page_count(9, PAGE_SIZE), 3);
        assert_eq!(page_count(10, PAGE_SIZE), 4);
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let input = StoreInput::default();
        let err = validate_store_input(&input).unwrap_err();
        let StoreError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.contains("store name")));
        assert!(errors.iter().any(|e| e.contains("address")));
        assert!(errors.iter().any(|e| e.contains("coordinates")));
    }

    #[test]
    fn test_validate_rejects_out_of_range_coordinates() {
        let input = StoreInput {
            name: "Bar".to_owned(),
            address: "X".to_owned(),
            lng: Some(200.0),
            lat: Some(10.0),
            ..StoreInput::default()
        };
        let err = validate_store_input(&input).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_validate_trims_and_drops_empty_fields() {
        let input = StoreInput {
            name: "  Bar  ".to_owned(),
            description: "   ".to_owned(),
            address: " 1 Main St ".to_owned(),
            lng: Some(1.0),
            lat: Some(2.0),
            tags: vec!["Wifi".to_owned(), "  ".to_owned()],
            photo: None,
        };
        let validated = validate_store_input(&input).unwrap();
        assert_eq!(validated.name, "Bar");
        assert_eq!(validated.address, "1 Main St");
        assert_eq!(validated.description, None);
        assert_eq!(validated.tags, vec!["Wifi".to_owned()]);
    }

    #[test]
    fn test_confirm_owner() {
        let store = Store {
            id: StoreId::new(1),
            name: "Bar".to_owned(),
            slug: "bar".to_owned(),
            description: None,
            tags: Vec::new(),
            created: chrono::Utc::now(),
            lng: 1.0,
            lat: 2.0,
            address: "X".to_owned(),
            photo: None,
            author: UserId::new(7),
        };

        assert!(confirm_owner(&store, UserId::new(7)).is_ok());
        assert!(matches!(
            confirm_owner(&store, UserId::new(8)),
            Err(StoreError::NotOwner)
        ));
    }
}
