//! Newtype wrappers for validated domain values.

mod email;
mod id;
mod point;

pub use email::{Email, EmailError};
pub use id::{ReviewId, StoreId, UserId};
pub use point::{Point, PointError};
