//! Store route handlers.
//!
//! Listing, creation, editing, detail, tag browsing, top-rated, and the
//! hearted-stores page. Form handlers flash validation errors and redirect
//! back rather than rendering inline errors.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use delicious_core::StoreId;

use crate::db::users::UserRepository;
use crate::error::AppError;
use crate::filters;
use crate::middleware::{OptionalAuth, RequireAuth, push_flash, take_flashes};
use crate::models::{CurrentUser, Flash, Store, TagCount, TopStore};
use crate::services::{
    MediaStore, StoreError, StoreService,
    stores::{StoreDetail, StoreInput},
};
use crate::state::AppState;

/// Tag choices offered on the store form.
pub const TAG_CHOICES: [&str; 5] = [
    "Wifi",
    "Open Late",
    "Family Friendly",
    "Vegetarian",
    "Licensed",
];

// =============================================================================
// Templates
// =============================================================================

/// Paginated store listing.
#[derive(Template, WebTemplate)]
#[template(path = "stores/index.html")]
pub struct StoresTemplate {
    pub current_user: Option<CurrentUser>,
    pub flashes: Vec<Flash>,
    pub stores: Vec<Store>,
    pub page: i64,
    pub pages: i64,
    pub count: i64,
}

/// Add/edit store form.
#[derive(Template, WebTemplate)]
#[template(path = "stores/edit.html")]
pub struct EditStoreTemplate {
    pub current_user: Option<CurrentUser>,
    pub flashes: Vec<Flash>,
    pub form: StoreForm,
    pub tag_choices: [&'static str; 5],
}

/// Store detail page.
#[derive(Template, WebTemplate)]
#[template(path = "stores/show.html")]
pub struct ShowStoreTemplate {
    pub current_user: Option<CurrentUser>,
    pub flashes: Vec<Flash>,
    pub detail: StoreDetail,
}

/// Tag browsing page.
#[derive(Template, WebTemplate)]
#[template(path = "tags.html")]
pub struct TagsTemplate {
    pub current_user: Option<CurrentUser>,
    pub flashes: Vec<Flash>,
    pub active_tag: Option<String>,
    pub tags: Vec<TagCount>,
    pub stores: Vec<Store>,
}

/// Top-rated stores page.
#[derive(Template, WebTemplate)]
#[template(path = "top.html")]
pub struct TopTemplate {
    pub current_user: Option<CurrentUser>,
    pub flashes: Vec<Flash>,
    pub stores: Vec<TopStore>,
}

/// Hearted stores page.
#[derive(Template, WebTemplate)]
#[template(path = "hearts.html")]
pub struct HeartsTemplate {
    pub current_user: Option<CurrentUser>,
    pub flashes: Vec<Flash>,
    pub stores: Vec<Store>,
}

/// Not-found page.
#[derive(Template, WebTemplate)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub current_user: Option<CurrentUser>,
    pub flashes: Vec<Flash>,
}

/// Pre-filled values for the store form.
///
/// `id` is `None` on the add form; the template switches the form action
/// on it.
#[derive(Debug, Clone, Default)]
pub struct StoreForm {
    pub id: Option<StoreId>,
    pub name: String,
    pub description: String,
    pub address: String,
    pub lng: String,
    pub lat: String,
    pub tags: Vec<String>,
}

impl StoreForm {
    /// Whether a tag checkbox should render checked.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

impl From<Store> for StoreForm {
    fn from(store: Store) -> Self {
        Self {
            id: Some(store.id),
            name: store.name,
            description: store.description.unwrap_or_default(),
            address: store.address,
            lng: store.lng.to_string(),
            lat: store.lat.to_string(),
            tags: store.tags,
        }
    }
}

// =============================================================================
// Listing Routes
// =============================================================================

/// First page of the store listing.
pub async fn index(
    state: State<AppState>,
    auth: OptionalAuth,
    session: Session,
) -> Result<Response, AppError> {
    paged(state, auth, session, Path(1)).await
}

/// A specific page of the store listing.
///
/// Asking for a page beyond the end redirects to the last page with an
/// explanatory flash instead of rendering an empty grid.
pub async fn paged(
    State(state): State<AppState>,
    OptionalAuth(current_user): OptionalAuth,
    session: Session,
    Path(page): Path<i64>,
) -> Result<Response, AppError> {
    let listing = StoreService::new(state.pool()).list_paged(page).await?;

    if listing.stores.is_empty() && listing.count > 0 {
        push_flash(
            &session,
            Flash::info(format!(
                "Hey! You asked for page {page}. But that doesn't exist. So I put you on page {}",
                listing.pages
            )),
        )
        .await?;
        return Ok(Redirect::to(&format!("/stores/page/{}", listing.pages)).into_response());
    }

    let flashes = take_flashes(&session).await;
    Ok(StoresTemplate {
        current_user,
        flashes,
        stores: listing.stores,
        page: listing.page,
        pages: listing.pages,
        count: listing.count,
    }
    .into_response())
}

// =============================================================================
// Create/Edit Routes
// =============================================================================

/// Display the empty store form.
pub async fn add_page(
    RequireAuth(current_user): RequireAuth,
    session: Session,
) -> Result<Response, AppError> {
    let flashes = take_flashes(&session).await;
    Ok(EditStoreTemplate {
        current_user: Some(current_user),
        flashes,
        form: StoreForm::default(),
        tag_choices: TAG_CHOICES,
    }
    .into_response())
}

/// Handle store creation.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(current_user): RequireAuth,
    session: Session,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let input = match parse_store_form(multipart, state.media()).await {
        Ok(input) => input,
        Err(e) => return flash_upload_error(&session, e, "/add").await,
    };

    match StoreService::new(state.pool())
        .create(input, current_user.id)
        .await
    {
        Ok(store) => {
            push_flash(
                &session,
                Flash::success(format!(
                    "Successfully created {}. Care to leave a review?",
                    store.name
                )),
            )
            .await?;
            Ok(Redirect::to(&format!("/store/{}", store.slug)).into_response())
        }
        Err(StoreError::Validation(errors)) => {
            flash_errors(&session, errors).await?;
            Ok(Redirect::to("/add").into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Display the edit form for an owned store.
pub async fn edit_page(
    State(state): State<AppState>,
    RequireAuth(current_user): RequireAuth,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let store = match StoreService::new(state.pool())
        .get_for_edit(StoreId::new(id), current_user.id)
        .await
    {
        Ok(store) => store,
        Err(e @ (StoreError::NotFound | StoreError::NotOwner)) => {
            return ownership_failure(&session, &e).await;
        }
        Err(e) => return Err(e.into()),
    };

    let flashes = take_flashes(&session).await;
    Ok(EditStoreTemplate {
        current_user: Some(current_user),
        flashes,
        form: store.into(),
        tag_choices: TAG_CHOICES,
    }
    .into_response())
}

/// Handle store update.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(current_user): RequireAuth,
    session: Session,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let edit_url = format!("/stores/{id}/edit");

    let input = match parse_store_form(multipart, state.media()).await {
        Ok(input) => input,
        Err(e) => return flash_upload_error(&session, e, &edit_url).await,
    };

    match StoreService::new(state.pool())
        .update(StoreId::new(id), input, current_user.id)
        .await
    {
        Ok(store) => {
            push_flash(
                &session,
                Flash::success(format!("Successfully updated {}.", store.name)),
            )
            .await?;
            Ok(Redirect::to(&format!("/store/{}", store.slug)).into_response())
        }
        Err(StoreError::Validation(errors)) => {
            flash_errors(&session, errors).await?;
            Ok(Redirect::to(&edit_url).into_response())
        }
        Err(e @ (StoreError::NotFound | StoreError::NotOwner)) => {
            ownership_failure(&session, &e).await
        }
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Detail Route
// =============================================================================

/// Store detail by slug.
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(current_user): OptionalAuth,
    session: Session,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    let detail = StoreService::new(state.pool()).get_detail(&slug).await?;
    let flashes = take_flashes(&session).await;

    match detail {
        Some(detail) => Ok(ShowStoreTemplate {
            current_user,
            flashes,
            detail,
        }
        .into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            NotFoundTemplate {
                current_user,
                flashes,
            },
        )
            .into_response()),
    }
}

// =============================================================================
// Aggregate Routes
// =============================================================================

/// Tag browsing: the tag cloud plus stores carrying the active tag, or all
/// tagged stores when no tag is selected.
pub async fn tags(
    State(state): State<AppState>,
    OptionalAuth(current_user): OptionalAuth,
    session: Session,
    active_tag: Option<Path<String>>,
) -> Result<Response, AppError> {
    let active_tag = active_tag.map(|Path(tag)| tag);
    let (stores, tags) = StoreService::new(state.pool())
        .list_by_tag(active_tag.as_deref())
        .await?;

    let flashes = take_flashes(&session).await;
    Ok(TagsTemplate {
        current_user,
        flashes,
        active_tag,
        tags,
        stores,
    }
    .into_response())
}

/// Top-rated stores.
pub async fn top(
    State(state): State<AppState>,
    OptionalAuth(current_user): OptionalAuth,
    session: Session,
) -> Result<Response, AppError> {
    let stores = StoreService::new(state.pool()).top_rated().await?;

    let flashes = take_flashes(&session).await;
    Ok(TopTemplate {
        current_user,
        flashes,
        stores,
    }
    .into_response())
}

/// The logged-in user's hearted stores.
pub async fn hearts(
    State(state): State<AppState>,
    RequireAuth(current_user): RequireAuth,
    session: Session,
) -> Result<Response, AppError> {
    let stores = UserRepository::new(state.pool())
        .hearted_stores(current_user.id)
        .await?;

    let flashes = take_flashes(&session).await;
    Ok(HeartsTemplate {
        current_user: Some(current_user),
        flashes,
        stores,
    }
    .into_response())
}

/// Fallback for any unmatched route.
pub async fn not_found(
    OptionalAuth(current_user): OptionalAuth,
    session: Session,
) -> impl IntoResponse {
    let flashes = take_flashes(&session).await;
    (
        StatusCode::NOT_FOUND,
        NotFoundTemplate {
            current_user,
            flashes,
        },
    )
}

// =============================================================================
// Helpers
// =============================================================================

/// Parse the multipart store form, storing an uploaded photo as a side
/// effect. Missing or non-numeric coordinates become `None` and fail
/// validation downstream with a friendlier message than a parse error.
async fn parse_store_form(
    mut multipart: Multipart,
    media: &MediaStore,
) -> Result<StoreInput, AppError> {
    let mut input = StoreInput::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "name" => input.name = field_text(field).await?,
            "description" => input.description = field_text(field).await?,
            "address" => input.address = field_text(field).await?,
            "lng" => input.lng = field_text(field).await?.trim().parse().ok(),
            "lat" => input.lat = field_text(field).await?.trim().parse().ok(),
            "tags" => input.tags.push(field_text(field).await?),
            "photo" => {
                let mime = field.content_type().map(ToOwned::to_owned);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                // An empty file field means no photo was chosen
                if !data.is_empty() {
                    let mime = mime
                        .ok_or_else(|| AppError::BadRequest("photo has no content type".into()))?;
                    let filename = media.store_photo(data.to_vec(), &mime).await?;
                    input.photo = Some(filename);
                }
            }
            _ => {}
        }
    }

    Ok(input)
}

async fn field_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

/// Flash every validation message.
async fn flash_errors(session: &Session, errors: Vec<String>) -> Result<(), AppError> {
    for error in errors {
        push_flash(session, Flash::error(error)).await?;
    }
    Ok(())
}

/// Turn a failed photo upload into a flash and a redirect back to the form.
/// Anything other than a client-side upload problem propagates.
async fn flash_upload_error(
    session: &Session,
    error: AppError,
    back_to: &str,
) -> Result<Response, AppError> {
    match error {
        AppError::Media(e) => {
            push_flash(session, Flash::error(format!("That file isn't allowed! ({e})"))).await?;
            Ok(Redirect::to(back_to).into_response())
        }
        AppError::BadRequest(msg) => {
            push_flash(session, Flash::error(msg)).await?;
            Ok(Redirect::to(back_to).into_response())
        }
        other => Err(other),
    }
}

/// A missing store or a foreign owner both flash and land back on the
/// listing; the page never crashes on someone else's store.
async fn ownership_failure(session: &Session, error: &StoreError) -> Result<Response, AppError> {
    let message = match error {
        StoreError::NotOwner => "You must own a store in order to edit it!",
        _ => "No store found with that id",
    };
    push_flash(session, Flash::error(message)).await?;
    Ok(Redirect::to("/stores").into_response())
}
