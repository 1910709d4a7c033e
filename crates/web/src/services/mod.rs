//! Application services.
//!
//! Services own validation and business rules; repositories underneath own
//! SQL. Route handlers call services and translate their errors into flash
//! messages, redirects, or API status codes.

pub mod email;
pub mod identity;
pub mod media;
pub mod stores;

pub use email::{EmailError, EmailService};
pub use identity::{IdentityError, IdentityService};
pub use media::{MediaError, MediaStore};
pub use stores::{StoreError, StoreService};
