//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::config::SecurityConfig;
use crate::db::repositories::user::{hash_password_blocking, verify_password};
use crate::db::{AuditRepository, NewUser, Store, UserRepository};
use crate::domain::credentials::MIN_PASSWORD_LENGTH;
use crate::domain::{Actor, AuditAction, Role, audit_entity};
use crate::services::auth_service::{
    AuthError, AuthService, LoginResult, Registration, UserProfile,
};
use crate::services::token::TokenService;

pub struct SeaOrmAuthService {
    store: Store,
    tokens: TokenService,
    security: SecurityConfig,
    allow_self_registration: bool,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(
        store: Store,
        tokens: TokenService,
        security: SecurityConfig,
        allow_self_registration: bool,
    ) -> Self {
        Self {
            store,
            tokens,
            security,
            allow_self_registration,
        }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn login(&self, login: &str, password: &str) -> Result<LoginResult, AuthError> {
        if login.trim().is_empty() || password.is_empty() {
            return Err(AuthError::Validation("email/password required".to_string()));
        }

        let user = self
            .store
            .users()
            .find_for_login(login)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(user.password_hash.clone(), password.to_string()).await? {
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        let access_token = self
            .tokens
            .issue(user.id, user.role)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let txn = self.store.begin().await?;
        AuditRepository::new(&txn)
            .record(
                Some(user.id),
                audit_entity::USER,
                Some(user.id),
                AuditAction::Login,
                json!({ "email": user.email }),
            )
            .await?;
        txn.commit().await?;

        info!(user_id = user.id, role = %user.role, "User logged in");

        Ok(LoginResult {
            access_token,
            role: user.role,
            must_change_password: user.must_change_password,
            is_active: user.is_active,
            name: user.name,
            email: user.email,
        })
    }

    fn authenticate(&self, token: &str) -> Result<Actor, AuthError> {
        self.tokens
            .verify(token)
            .map_err(|_| AuthError::InvalidCredentials)
    }

    async fn register(&self, registration: Registration) -> Result<UserProfile, AuthError> {
        if !self.allow_self_registration {
            return Err(AuthError::RegistrationDisabled);
        }

        let name = registration.name.trim().to_string();
        let email = registration.email.trim().to_lowercase();
        if name.is_empty() || email.is_empty() || registration.password.is_empty() {
            return Err(AuthError::Validation(
                "name/email/password required".to_string(),
            ));
        }
        if registration.password.len() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::Validation(format!(
                "min {MIN_PASSWORD_LENGTH} characters required"
            )));
        }

        let password_hash =
            hash_password_blocking(registration.password, self.security.clone()).await?;

        let txn = self.store.begin().await?;
        let users = UserRepository::new(&txn);
        if users.email_taken(&email).await? {
            return Err(AuthError::Conflict("email already exists".to_string()));
        }

        let user = users
            .insert(NewUser {
                name,
                email,
                username: None,
                password_hash,
                role: Role::Tech,
                must_change_password: false,
                last_temp_password: None,
            })
            .await?;

        AuditRepository::new(&txn)
            .record(
                Some(user.id),
                audit_entity::USER,
                Some(user.id),
                AuditAction::Create,
                json!({ "email": user.email, "role": user.role, "source": "register" }),
            )
            .await?;
        txn.commit().await?;

        info!(user_id = user.id, "User self-registered");
        Ok(user.into())
    }

    async fn profile(&self, user_id: i32) -> Result<UserProfile, AuthError> {
        let user = self
            .store
            .users()
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        Ok(user.into())
    }

    async fn change_password(&self, user_id: i32, new_password: &str) -> Result<(), AuthError> {
        if new_password.len() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::Validation(format!(
                "min {MIN_PASSWORD_LENGTH} characters required"
            )));
        }

        let password_hash =
            hash_password_blocking(new_password.to_string(), self.security.clone()).await?;

        let txn = self.store.begin().await?;
        let users = UserRepository::new(&txn);
        let user = users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        users.set_own_password(user, password_hash).await?;
        AuditRepository::new(&txn)
            .record(
                Some(user_id),
                audit_entity::USER,
                Some(user_id),
                AuditAction::Update,
                json!({ "password": "changed" }),
            )
            .await?;
        txn.commit().await?;

        info!(user_id, "Password changed");
        Ok(())
    }
}
