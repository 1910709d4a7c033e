//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Store listing (page 1)
//! GET  /stores                 - Store listing (page 1)
//! GET  /stores/page/{page}     - Store listing, paginated
//! GET  /add                    - Store form (requires auth)
//! POST /add                    - Create store (multipart)
//! POST /add/{id}               - Update store (multipart, owner only)
//! GET  /stores/{id}/edit       - Edit form (owner only)
//! GET  /store/{slug}           - Store detail
//! GET  /tags                   - Tag listing
//! GET  /tags/{tag}             - Stores carrying a tag
//! GET  /top                    - Top-rated stores
//! GET  /hearts                 - Hearted stores (requires auth)
//! POST /reviews/{store_id}     - Add review (requires auth)
//!
//! # Auth
//! GET  /login                  - Login page
//! POST /login                  - Login action
//! GET  /register               - Register page
//! POST /register               - Register action
//! GET  /logout                 - Logout action
//!
//! # Account
//! GET  /account                - Account edit page (requires auth)
//! POST /account                - Update account (requires auth)
//! POST /account/forgot         - Request password reset email
//! GET  /account/reset/{token}  - Reset form (token checked)
//! POST /account/reset/{token}  - Reset action
//!
//! # JSON API
//! GET  /api/search?q=          - Text search results
//! GET  /api/stores/near?lat=&lng= - Stores within 10km
//! POST /api/stores/{id}/heart  - Toggle heart (requires auth)
//! ```

pub mod account;
pub mod api;
pub mod auth;
pub mod reviews;
pub mod stores;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the full application router (without middleware layers).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(stores::index))
        .route("/stores", get(stores::index))
        .route("/stores/page/{page}", get(stores::paged))
        .route("/add", get(stores::add_page).post(stores::create))
        .route("/add/{id}", post(stores::update))
        .route("/stores/{id}/edit", get(stores::edit_page))
        .route("/store/{slug}", get(stores::show))
        .route("/tags", get(stores::tags))
        .route("/tags/{tag}", get(stores::tags))
        .route("/top", get(stores::top))
        .route("/hearts", get(stores::hearts))
        .route("/reviews/{store_id}", post(reviews::add))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", get(auth::logout))
        .route("/account", get(account::show).post(account::update))
        .route("/account/forgot", post(account::forgot))
        .route(
            "/account/reset/{token}",
            get(account::reset_page).post(account::reset),
        )
        .route("/api/search", get(api::search))
        .route("/api/stores/near", get(api::near))
        .route("/api/stores/{id}/heart", post(api::heart))
        .fallback(stores::not_found)
}
