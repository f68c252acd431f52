//! Domain service for admin-driven user provisioning.

use serde::Serialize;
use thiserror::Error;

use crate::domain::role::InvalidRole;
use crate::domain::{Actor, Role};
use crate::entities::users;

#[derive(Debug, Error)]
pub enum UserAdminError {
    #[error("User {0} not found")]
    NotFound(i32),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for UserAdminError {
    fn from(err: sea_orm::DbErr) -> Self {
        if crate::db::is_unique_violation(&err) {
            Self::Conflict("email or username already exists".to_string())
        } else {
            Self::Database(err.to_string())
        }
    }
}

impl From<anyhow::Error> for UserAdminError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<InvalidRole> for UserAdminError {
    fn from(err: InvalidRole) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Row of the admin user table. Carries the last issued temporary password.
#[derive(Debug, Clone, Serialize)]
pub struct AdminUserView {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub username: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub must_change_password: bool,
    pub last_temp_password: Option<String>,
}

impl From<users::Model> for AdminUserView {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            username: user.username,
            role: user.role,
            is_active: user.is_active,
            must_change_password: user.must_change_password,
            last_temp_password: user.last_temp_password,
        }
    }
}

/// One provisioning request, single or from a bulk row.
#[derive(Debug, Clone, Default)]
pub struct ProvisionRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub username: Option<String>,
    pub temp_password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProvisionedUser {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub username: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub must_change_password: bool,
    pub temp_password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkCreated {
    pub row: usize,
    pub id: i32,
    pub name: String,
    pub email: String,
    pub username: Option<String>,
    pub role: Role,
    pub temp_password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkRowError {
    pub row: usize,
    pub email: Option<String>,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkOutcome {
    pub created: Vec<BulkCreated>,
    pub errors: Vec<BulkRowError>,
}

/// Bulk input, either structured rows or CSV text with a
/// `name,email,role,username` header.
#[derive(Debug, Clone)]
pub enum BulkSource {
    Rows(Vec<ProvisionRequest>),
    Csv(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordReset {
    pub user_id: i32,
    pub temp_password: String,
}

/// Domain service trait for user administration. Callers are ADMIN.
#[async_trait::async_trait]
pub trait UserAdminService: Send + Sync {
    async fn list(&self) -> Result<Vec<AdminUserView>, UserAdminError>;

    /// Creates an active user that must change the issued temporary password.
    async fn create(
        &self,
        actor: &Actor,
        request: ProvisionRequest,
    ) -> Result<ProvisionedUser, UserAdminError>;

    /// Rows succeed or fail independently; successful rows commit together.
    async fn bulk_create(
        &self,
        actor: &Actor,
        source: BulkSource,
    ) -> Result<BulkOutcome, UserAdminError>;

    /// First unused username derived from `name`, else the email local part.
    async fn suggest_username(&self, name: &str, email: &str) -> Result<String, UserAdminError>;

    async fn set_role(&self, actor: &Actor, user_id: i32, role: &str) -> Result<Role, UserAdminError>;

    async fn set_status(
        &self,
        actor: &Actor,
        user_id: i32,
        is_active: bool,
    ) -> Result<bool, UserAdminError>;

    async fn reset_password(
        &self,
        actor: &Actor,
        user_id: i32,
        temp_password: Option<String>,
    ) -> Result<PasswordReset, UserAdminError>;
}
