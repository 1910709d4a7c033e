//! Flash messages.
//!
//! Flashes are queued in the session and drained by the next rendered page.
//! Redirect-heavy flows (form post, then GET) rely on this to carry
//! feedback across the redirect.

use tower_sessions::Session;

use crate::models::{Flash, session_keys};

/// Queue a flash message for the next page render.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn push_flash(
    session: &Session,
    flash: Flash,
) -> Result<(), tower_sessions::session::Error> {
    let mut flashes: Vec<Flash> = session
        .get(session_keys::FLASHES)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    flashes.push(flash);
    session.insert(session_keys::FLASHES, &flashes).await
}

/// Drain all pending flash messages.
///
/// Returns an empty vec on any session error; a page render should never
/// fail because flashes could not be read.
pub async fn take_flashes(session: &Session) -> Vec<Flash> {
    session
        .remove::<Vec<Flash>>(session_keys::FLASHES)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}
