//! Domain service for authentication.
//!
//! Handles login, token verification, self-registration and password changes.

use serde::Serialize;
use thiserror::Error;

use crate::domain::{Actor, Role};
use crate::entities::users;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account disabled")]
    AccountDisabled,

    #[error("registration is disabled")]
    RegistrationDisabled,

    #[error("User not found")]
    UserNotFound,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        if crate::db::is_unique_violation(&err) {
            return Self::Conflict("email already exists".to_string());
        }
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Public profile of a user, as returned by `/auth/me`.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub username: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub must_change_password: bool,
}

impl From<users::Model> for UserProfile {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            username: user.username,
            role: user.role,
            is_active: user.is_active,
            must_change_password: user.must_change_password,
        }
    }
}

/// Login result containing the signed token and first-login flags.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub access_token: String,
    pub role: Role,
    pub must_change_password: bool,
    pub is_active: bool,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Verifies credentials and issues a token. `login` is an email, or a
    /// username when it contains no `@`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if login fails and
    /// [`AuthError::AccountDisabled`] for deactivated accounts.
    async fn login(&self, login: &str, password: &str) -> Result<LoginResult, AuthError>;

    /// Resolves a bearer token to the acting user.
    fn authenticate(&self, token: &str) -> Result<Actor, AuthError>;

    /// Creates a TECH account when self-registration is enabled.
    async fn register(&self, registration: Registration) -> Result<UserProfile, AuthError>;

    async fn profile(&self, user_id: i32) -> Result<UserProfile, AuthError>;

    /// Sets a user-chosen password and clears any temporary credential.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] if the new password is too short.
    async fn change_password(&self, user_id: i32, new_password: &str) -> Result<(), AuthError>;
}
