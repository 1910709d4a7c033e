//! Authentication route handlers.
//!
//! Login, registration, and logout. Password reset lives in the account
//! routes alongside the rest of the account surface.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::AppError;
use crate::filters;
use crate::middleware::{
    OptionalAuth, clear_current_user, push_flash, set_current_user, take_flashes,
};
use crate::models::{CurrentUser, Flash};
use crate::services::{IdentityError, IdentityService, identity::RegisterInput};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "password-confirm")]
    pub password_confirm: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub current_user: Option<CurrentUser>,
    pub flashes: Vec<Flash>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub current_user: Option<CurrentUser>,
    pub flashes: Vec<Flash>,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    OptionalAuth(current_user): OptionalAuth,
    session: Session,
) -> impl IntoResponse {
    let flashes = take_flashes(&session).await;
    LoginTemplate {
        current_user,
        flashes,
    }
}

/// Handle login form submission.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    match IdentityService::new(state.pool())
        .authenticate(&form.email, &form.password)
        .await
    {
        Ok(user) => {
            set_current_user(&session, &user.into()).await?;
            push_flash(&session, Flash::success("You are now logged in!")).await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(IdentityError::InvalidCredentials) => {
            push_flash(&session, Flash::error("Failed Login!")).await?;
            Ok(Redirect::to("/login").into_response())
        }
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(
    OptionalAuth(current_user): OptionalAuth,
    session: Session,
) -> impl IntoResponse {
    let flashes = take_flashes(&session).await;
    RegisterTemplate {
        current_user,
        flashes,
    }
}

/// Handle registration form submission.
///
/// A successful registration logs the user straight in.
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    let input = RegisterInput {
        email: form.email,
        name: form.name,
        password: form.password,
        password_confirm: form.password_confirm,
    };

    match IdentityService::new(state.pool()).register(input).await {
        Ok(user) => {
            set_current_user(&session, &user.into()).await?;
            push_flash(&session, Flash::success("You are now logged in!")).await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(IdentityError::Validation(errors)) => {
            for error in errors {
                push_flash(&session, Flash::error(error)).await?;
            }
            Ok(Redirect::to("/register").into_response())
        }
        Err(IdentityError::EmailTaken) => {
            push_flash(&session, Flash::error("That email is already registered!")).await?;
            Ok(Redirect::to("/register").into_response())
        }
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Logout Route
// =============================================================================

/// Handle logout.
pub async fn logout(session: Session) -> Result<Response, AppError> {
    clear_current_user(&session).await?;
    push_flash(&session, Flash::success("You are now logged out!")).await?;
    Ok(Redirect::to("/").into_response())
}
