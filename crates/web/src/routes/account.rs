//! Account route handlers.
//!
//! Profile editing plus the password-reset flow: request a tokenized email,
//! follow the link, choose a new password.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::AppError;
use crate::filters;
use crate::middleware::{
    OptionalAuth, RequireAuth, push_flash, set_current_user, take_flashes,
};
use crate::models::{CurrentUser, Flash};
use crate::services::{IdentityError, IdentityService};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Account edit form data.
#[derive(Debug, Deserialize)]
pub struct AccountForm {
    pub name: String,
    pub email: String,
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotForm {
    pub email: String,
}

/// Reset password form data.
#[derive(Debug, Deserialize)]
pub struct ResetForm {
    pub password: String,
    #[serde(rename = "password-confirm")]
    pub password_confirm: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Account edit page template.
#[derive(Template, WebTemplate)]
#[template(path = "account.html")]
pub struct AccountTemplate {
    pub current_user: Option<CurrentUser>,
    pub flashes: Vec<Flash>,
}

/// Reset password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset.html")]
pub struct ResetTemplate {
    pub current_user: Option<CurrentUser>,
    pub flashes: Vec<Flash>,
    pub token: String,
}

// =============================================================================
// Account Routes
// =============================================================================

/// Display the account edit page.
pub async fn show(
    RequireAuth(current_user): RequireAuth,
    session: Session,
) -> impl IntoResponse {
    let flashes = take_flashes(&session).await;
    AccountTemplate {
        current_user: Some(current_user),
        flashes,
    }
}

/// Handle account edit form submission.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(current_user): RequireAuth,
    session: Session,
    Form(form): Form<AccountForm>,
) -> Result<Response, AppError> {
    match IdentityService::new(state.pool())
        .update_account(current_user.id, &form.name, &form.email)
        .await
    {
        Ok(user) => {
            // Keep the session identity in step with the profile
            set_current_user(&session, &user.into()).await?;
            push_flash(&session, Flash::success("Updated the profile!")).await?;
        }
        Err(IdentityError::Validation(errors)) => {
            for error in errors {
                push_flash(&session, Flash::error(error)).await?;
            }
        }
        Err(IdentityError::EmailTaken) => {
            push_flash(&session, Flash::error("That email is already registered!")).await?;
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Redirect::to("/account").into_response())
}

// =============================================================================
// Password Reset Routes
// =============================================================================

/// Handle forgot password form submission.
///
/// Always flashes the same confirmation, whether or not the email belongs
/// to an account, so addresses cannot be probed.
pub async fn forgot(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ForgotForm>,
) -> Result<Response, AppError> {
    if let Some((user, token)) = IdentityService::new(state.pool())
        .start_password_reset(&form.email)
        .await?
    {
        let reset_url = format!("{}/account/reset/{token}", state.config().base_url);
        state
            .email()
            .send_password_reset(user.email.as_str(), &reset_url)
            .await?;
    }

    push_flash(
        &session,
        Flash::success("You have been emailed a password reset link."),
    )
    .await?;
    Ok(Redirect::to("/login").into_response())
}

/// Display the reset password form, if the token is still good.
pub async fn reset_page(
    State(state): State<AppState>,
    OptionalAuth(current_user): OptionalAuth,
    session: Session,
    Path(token): Path<String>,
) -> Result<Response, AppError> {
    match IdentityService::new(state.pool())
        .validate_reset_token(&token)
        .await
    {
        Ok(_) => {
            let flashes = take_flashes(&session).await;
            Ok(ResetTemplate {
                current_user,
                flashes,
                token,
            }
            .into_response())
        }
        Err(IdentityError::TokenInvalid) => token_invalid(&session).await,
        Err(e) => Err(e.into()),
    }
}

/// Handle reset password form submission. Success logs the user in.
pub async fn reset(
    State(state): State<AppState>,
    session: Session,
    Path(token): Path<String>,
    Form(form): Form<ResetForm>,
) -> Result<Response, AppError> {
    match IdentityService::new(state.pool())
        .reset_password(&token, &form.password, &form.password_confirm)
        .await
    {
        Ok(user) => {
            set_current_user(&session, &user.into()).await?;
            push_flash(
                &session,
                Flash::success("Nice! Your password has been reset! You are now logged in!"),
            )
            .await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(IdentityError::Validation(errors)) => {
            for error in errors {
                push_flash(&session, Flash::error(error)).await?;
            }
            Ok(Redirect::to(&format!("/account/reset/{token}")).into_response())
        }
        Err(IdentityError::TokenInvalid) => token_invalid(&session).await,
        Err(e) => Err(e.into()),
    }
}

/// An unknown or expired token lands back on the login page.
async fn token_invalid(session: &Session) -> Result<Response, AppError> {
    push_flash(
        session,
        Flash::error("Password reset is invalid or has expired"),
    )
    .await?;
    Ok(Redirect::to("/login").into_response())
}
