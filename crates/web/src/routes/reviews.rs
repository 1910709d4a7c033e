//! Review route handlers.

use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use delicious_core::StoreId;

use crate::error::AppError;
use crate::middleware::{RequireAuth, push_flash};
use crate::models::Flash;
use crate::services::{StoreError, StoreService};
use crate::state::AppState;

/// Review form data.
#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    pub text: String,
    pub rating: i32,
}

/// Handle review form submission, landing back on the store page.
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(current_user): RequireAuth,
    session: Session,
    Path(store_id): Path<i32>,
    Form(form): Form<ReviewForm>,
) -> Result<Response, AppError> {
    match StoreService::new(state.pool())
        .add_review(StoreId::new(store_id), current_user.id, &form.text, form.rating)
        .await
    {
        Ok((store, _review)) => {
            push_flash(&session, Flash::success("Review Saved!")).await?;
            Ok(Redirect::to(&format!("/store/{}", store.slug)).into_response())
        }
        Err(StoreError::Validation(errors)) => {
            for error in errors {
                push_flash(&session, Flash::error(error)).await?;
            }
            Ok(Redirect::to("/stores").into_response())
        }
        Err(StoreError::NotFound) => {
            push_flash(&session, Flash::error("No store found with that id")).await?;
            Ok(Redirect::to("/stores").into_response())
        }
        Err(e) => Err(e.into()),
    }
}
