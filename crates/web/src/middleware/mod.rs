//! HTTP middleware: session store, auth extractors, and flash messages.

pub mod auth;
pub mod flash;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, clear_current_user, set_current_user};
pub use flash::{push_flash, take_flashes};
pub use session::{create_session_layer, create_session_store};
