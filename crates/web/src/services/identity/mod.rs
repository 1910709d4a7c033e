//! Identity service.
//!
//! Registration, credential checks, and the password-reset token
//! lifecycle. Session establishment is the route layer's job; this service
//! only decides who the user is.

mod error;

pub use error::IdentityError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use sqlx::PgPool;

use delicious_core::{Email, UserId};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::User;

/// Length of a password-reset token.
const RESET_TOKEN_LENGTH: usize = 40;

/// How long a password-reset token stays valid.
const RESET_TOKEN_TTL_HOURS: i64 = 1;

/// Registration form input.
#[derive(Debug, Clone, Default)]
pub struct RegisterInput {
    pub email: String,
    pub name: String,
    pub password: String,
    pub password_confirm: String,
}

/// Identity service.
pub struct IdentityService<'a> {
    users: UserRepository<'a>,
}

impl<'a> IdentityService<'a> {
    /// Create a new identity service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Validation` listing every violated rule, or
    /// `IdentityError::EmailTaken` if the email is already registered.
    pub async fn register(&self, input: RegisterInput) -> Result<User, IdentityError> {
        let (email, name) = validate_registration(&input)?;

        let password_hash = hash_password(&input.password)?;

        let user = self
            .users
            .create(&email, &name, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => IdentityError::EmailTaken,
                other => IdentityError::Repository(other),
            })?;

        Ok(user)
    }

    /// Verify credentials.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidCredentials` on any failure; callers
    /// never learn whether the email or the password was wrong.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, IdentityError> {
        let email = Email::parse(email).map_err(|_| IdentityError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(IdentityError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Start a password reset.
    ///
    /// `Ok(None)` means no account exists for the email. The caller shows
    /// the same outward confirmation either way, so unregistered addresses
    /// are not revealed.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Repository` if persisting the token fails.
    pub async fn start_password_reset(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>, IdentityError> {
        let Ok(email) = Email::parse(email) else {
            return Ok(None);
        };
        let Some(user) = self.users.get_by_email(&email).await? else {
            return Ok(None);
        };

        let token = generate_reset_token();
        let expires = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);
        self.users.set_reset_token(user.id, &token, expires).await?;

        Ok(Some((user, token)))
    }

    /// Resolve a reset token to its user.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::TokenInvalid` if no user holds the token or
    /// it is at or past its expiry.
    pub async fn validate_reset_token(&self, token: &str) -> Result<User, IdentityError> {
        let (user, expires) = self
            .users
            .get_by_reset_token(token)
            .await?
            .ok_or(IdentityError::TokenInvalid)?;

        if !token_still_valid(expires, Utc::now()) {
            return Err(IdentityError::TokenInvalid);
        }

        Ok(user)
    }

    /// Complete a password reset: set the new hash, clear both reset
    /// fields, and return the user so the caller can log them in.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Validation` if the passwords are blank or do
    /// not match, or `IdentityError::TokenInvalid` for a bad token.
    pub async fn reset_password(
        &self,
        token: &str,
        password: &str,
        password_confirm: &str,
    ) -> Result<User, IdentityError> {
        let mut errors = Vec::new();
        if password.is_empty() {
            errors.push("Password cannot be blank".to_owned());
        }
        if password != password_confirm {
            errors.push("Your passwords do not match".to_owned());
        }
        if !errors.is_empty() {
            return Err(IdentityError::Validation(errors));
        }

        let user = self.validate_reset_token(token).await?;

        let password_hash = hash_password(password)?;
        self.users.set_password(user.id, &password_hash).await?;

        Ok(user)
    }

    /// Update a user's display name and email.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Validation` on bad input or
    /// `IdentityError::EmailTaken` if the new email belongs to someone else.
    pub async fn update_account(
        &self,
        id: UserId,
        name: &str,
        email: &str,
    ) -> Result<User, IdentityError> {
        let mut errors = Vec::new();

        let name = name.trim();
        if name.is_empty() {
            errors.push("You must supply a name".to_owned());
        }
        let email = match Email::parse(email) {
            Ok(email) => Some(email),
            Err(_) => {
                errors.push("That email is not valid".to_owned());
                None
            }
        };

        let email = match (email, errors.is_empty()) {
            (Some(email), true) => email,
            _ => return Err(IdentityError::Validation(errors)),
        };

        self.users
            .update_profile(id, name, &email)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => IdentityError::EmailTaken,
                other => IdentityError::Repository(other),
            })
    }
}

/// Validate registration input, collecting every violated rule.
///
/// Email normalization lowercases the address but keeps sub-addresses
/// (`user+tag@`) intact.
fn validate_registration(input: &RegisterInput) -> Result<(Email, String), IdentityError> {
    let mut errors = Vec::new();

    let name = input.name.trim().to_owned();
    if name.is_empty() {
        errors.push("You must supply a name".to_owned());
    }

    let email = match Email::parse(&input.email) {
        Ok(email) => Some(email),
        Err(_) => {
            errors.push("That email is not valid".to_owned());
            None
        }
    };

    if input.password.is_empty() {
        errors.push("Password cannot be blank".to_owned());
    }
    if input.password_confirm.is_empty() {
        errors.push("Confirmed password cannot be blank".to_owned());
    }
    if input.password != input.password_confirm {
        errors.push("Your passwords do not match".to_owned());
    }

    match (email, errors.is_empty()) {
        (Some(email), true) => Ok((email, name)),
        _ => Err(IdentityError::Validation(errors)),
    }
}

/// A token is usable only strictly before its expiry instant.
#[must_use]
pub fn token_still_valid(expires: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now < expires
}

/// Generate an opaque password-reset token.
fn generate_reset_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RESET_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, IdentityError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| IdentityError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), IdentityError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| IdentityError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| IdentityError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn valid_input() -> RegisterInput {
        RegisterInput {
            email: "a@b.com".to_owned(),
            name: "A".to_owned(),
            password: "pw".to_owned(),
            password_confirm: "pw".to_owned(),
        }
    }

    #[test]
    fn test_validate_registration_ok() {
        let (email, name) = validate_registration(&valid_input()).unwrap();
        assert_eq!(email.as_str(), "a@b.com");
        assert_eq!(name, "A");
    }

    #[test]
    fn test_validate_registration_collects_all_errors() {
        let input = RegisterInput::default();
        let err = validate_registration(&input).unwrap_err();
        let IdentityError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        // name, email, password, confirmation - mismatch doesn't fire when
        // both are empty and therefore equal
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_validate_registration_password_mismatch() {
        let input = RegisterInput {
            password_confirm: "pw2".to_owned(),
            ..valid_input()
        };
        let err = validate_registration(&input).unwrap_err();
        let IdentityError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors, vec!["Your passwords do not match".to_owned()]);
    }

    #[test]
    fn test_token_valid_strictly_before_expiry() {
        let expires = Utc::now();
        assert!(token_still_valid(expires, expires - Duration::seconds(1)));
        // exactly at expiry is rejected
        assert!(!token_still_valid(expires, expires));
        assert!(!token_still_valid(expires, expires + Duration::seconds(1)));
    }

    #[test]
    fn test_generate_reset_token_shape() {
        let token = generate_reset_token();
        assert_eq!(token.len(), RESET_TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        // opaque tokens should not repeat
        assert_ne!(token, generate_reset_token());
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong", &hash),
            Err(IdentityError::InvalidCredentials)
        ));
    }
}
