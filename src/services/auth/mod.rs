//! Authentication service.
//!
//! Provides registration, username/password token issuance, token refresh
//! and bearer-token authentication.

mod error;
mod tokens;

pub use error::AuthError;
pub use tokens::{Claims, TokenIssuer, TokenKind, TokenPair};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::{NewUser, User};
use crate::store::{RepositoryError, Store};
use crate::validation::{self, FieldErrors};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Registration form.
#[derive(Clone, Default, Deserialize, Validate)]
pub struct Registration {
    #[serde(default)]
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[serde(default)]
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password2: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 150))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 150))]
    pub last_name: String,
}

impl Registration {
    fn check(&self) -> FieldErrors {
        let mut errors = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => validation::field_errors(&e),
        };
        if self.email.is_empty() {
            errors.insert("email".into(), vec![validation::BLANK.into()]);
        }
        if let Err(message) = validate_password(&self.password) {
            validation::push(&mut errors, "password", message);
        }
        if self.password != self.password2 {
            validation::push(&mut errors, "password", "Password fields didn't match.");
        }
        errors
    }
}

/// Authentication service.
pub struct AuthService<'a> {
    store: &'a dyn Store,
    tokens: &'a TokenIssuer,
}

impl<'a> AuthService<'a> {
    pub fn new(store: &'a dyn Store, tokens: &'a TokenIssuer) -> Self {
        Self { store, tokens }
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Invalid` with per-field messages when the form is
    /// rejected, including a taken username or email.
    pub async fn register(&self, form: Registration) -> Result<User, AuthError> {
        let mut errors = form.check();
        let mut uow = self.store.begin().await?;

        if !form.username.is_empty() && uow.find_user_by_username(&form.username).await?.is_some() {
            validation::push(&mut errors, "username", "A user with that username already exists.");
        }
        if !form.email.is_empty() && uow.find_user_by_email(&form.email).await?.is_some() {
            validation::push(&mut errors, "email", "A user with that email already exists.");
        }
        if !errors.is_empty() {
            return Err(AuthError::Invalid(errors));
        }

        let new_user = NewUser {
            password_hash: hash_password(&form.password)?,
            username: form.username,
            email: form.email,
            first_name: form.first_name,
            last_name: form.last_name,
        };
        let user = uow.insert_user(new_user).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::Invalid(FieldErrors::from([(
                "username".to_string(),
                vec!["A user with that username already exists.".to_string()],
            )])),
            other => AuthError::Repository(other),
        })?;
        uow.commit().await?;

        tracing::info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Exchange username/password for an access/refresh pair.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the username is unknown or
    /// the password is wrong.
    pub async fn obtain_pair(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        let mut uow = self.store.begin().await?;
        let (user, password_hash) = uow.find_credentials(username).await?.ok_or(AuthError::InvalidCredentials)?;
        verify_password(password, &password_hash)?;

        tracing::debug!(user_id = %user.id, "token pair issued");
        self.tokens.issue_pair(user.id)
    }

    /// Issue a fresh access token from a refresh token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for anything but a valid refresh
    /// token of an existing user.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let claims = self.tokens.verify(refresh_token, TokenKind::Refresh)?;
        let mut uow = self.store.begin().await?;
        if uow.find_user(claims.sub).await?.is_none() {
            return Err(AuthError::InvalidToken);
        }
        self.tokens.issue(claims.sub, TokenKind::Access)
    }

    /// Resolve the user behind an access token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` or `AuthError::UserNotFound`.
    pub async fn authenticate(&self, access_token: &str) -> Result<User, AuthError> {
        let claims = self.tokens.verify(access_token, TokenKind::Access)?;
        let mut uow = self.store.begin().await?;
        uow.find_user(claims.sub).await?.ok_or(AuthError::UserNotFound)
    }

    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the lookup fails.
    pub async fn find_user(&self, id: Uuid) -> Result<Option<User>, AuthError> {
        let mut uow = self.store.begin().await?;
        Ok(uow.find_user(id).await?)
    }
}

fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err(validation::BLANK.to_string());
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "This password is too short. It must contain at least {MIN_PASSWORD_LENGTH} characters."
        ));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err("This password is entirely numeric.".to_string());
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
