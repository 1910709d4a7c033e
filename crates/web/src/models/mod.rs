//! Domain models.
//!
//! Row types decoded straight from `PostgreSQL` via `sqlx::FromRow`, plus
//! the validated input types the services accept.

pub mod review;
pub mod session;
pub mod store;
pub mod user;

pub use review::{Review, ReviewWithAuthor};
pub use session::{CurrentUser, Flash, FlashKind, session_keys};
pub use store::{Store, StoreDraft, StorePreview, TagCount, TopStore};
pub use user::User;
