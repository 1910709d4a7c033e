//! JSON API route handlers.
//!
//! Small endpoints backing client-side behavior: typeahead search, the map
//! view, and heart toggling.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

use delicious_core::StoreId;

use crate::db::users::UserRepository;
use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::models::{Store, StorePreview};
use crate::services::StoreService;
use crate::state::AppState;

/// Query parameters for text search.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Query parameters for geo search.
#[derive(Debug, Deserialize)]
pub struct NearQuery {
    pub lng: f64,
    pub lat: f64,
}

/// Response body for heart toggling: the user's full heart list.
#[derive(Debug, Serialize)]
pub struct HeartsResponse {
    pub hearts: Vec<StoreId>,
}

/// Full-text store search, ranked by relevance.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Store>>, AppError> {
    let stores = StoreService::new(state.pool()).search_text(&query.q).await?;
    Ok(Json(stores))
}

/// Stores within 10km of a point, nearest first.
pub async fn near(
    State(state): State<AppState>,
    Query(query): Query<NearQuery>,
) -> Result<Json<Vec<StorePreview>>, AppError> {
    let stores = StoreService::new(state.pool())
        .search_near(query.lng, query.lat)
        .await?;
    Ok(Json(stores))
}

/// Toggle a heart on a store for the logged-in user.
pub async fn heart(
    State(state): State<AppState>,
    RequireAuth(current_user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Json<HeartsResponse>, AppError> {
    let hearts = UserRepository::new(state.pool())
        .toggle_heart(current_user.id, StoreId::new(id))
        .await?;
    Ok(Json(HeartsResponse { hearts }))
}
