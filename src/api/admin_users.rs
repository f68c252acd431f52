//! User administration endpoints (ADMIN only).

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::validation::validate_id;
use super::{ApiError, ApiResponse, AppState};
use crate::domain::{Actor, Role};
use crate::services::{
    AdminUserView, BulkOutcome, BulkSource, PasswordReset, ProvisionRequest, UserAdminError,
};

#[derive(Debug, Default, Deserialize)]
pub struct ProvisionPayload {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub username: Option<String>,
    pub temp_password: Option<String>,
}

impl From<ProvisionPayload> for ProvisionRequest {
    fn from(p: ProvisionPayload) -> Self {
        Self {
            name: p.name,
            email: p.email,
            role: p.role,
            username: p.username,
            temp_password: p.temp_password,
        }
    }
}

/// Either `users` (array of rows) or `csv` (text with a header row).
#[derive(Debug, Default, Deserialize)]
pub struct BulkPayload {
    pub users: Option<Vec<ProvisionPayload>>,
    pub csv: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SuggestQuery {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuggestResponse {
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub message: &'static str,
    pub role: Role,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusRequest {
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub message: &'static str,
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetRequest {
    pub temp_password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub reset: PasswordReset,
}

impl From<UserAdminError> for ApiError {
    fn from(err: UserAdminError) -> Self {
        match err {
            UserAdminError::NotFound(id) => Self::not_found("User", id),
            UserAdminError::Validation(msg) => Self::validation(msg),
            UserAdminError::Conflict(msg) => Self::Conflict(msg),
            UserAdminError::Database(msg) => Self::DatabaseError(msg),
            UserAdminError::Internal(msg) => Self::internal(msg),
        }
    }
}

/// `GET /api/admin/users`
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<AdminUserView>>>, ApiError> {
    let users = state.user_admin_service().list().await?;
    Ok(Json(ApiResponse::success(users)))
}

/// `POST /api/admin/users`
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<ProvisionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .user_admin_service()
        .create(&actor, payload.into())
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

/// `POST /api/admin/users/bulk`
pub async fn bulk_create_users(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<BulkPayload>,
) -> Result<Json<ApiResponse<BulkOutcome>>, ApiError> {
    let source = match (payload.users, payload.csv) {
        (Some(rows), _) => BulkSource::Rows(rows.into_iter().map(Into::into).collect()),
        (None, Some(csv)) => BulkSource::Csv(csv),
        (None, None) => {
            return Err(ApiError::validation("Provide 'users' array or 'csv' string"));
        }
    };

    let outcome = state
        .user_admin_service()
        .bulk_create(&actor, source)
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// `GET /api/admin/users/suggest-username?name=&email=`
pub async fn suggest_username(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SuggestQuery>,
) -> Result<Json<ApiResponse<SuggestResponse>>, ApiError> {
    let username = state
        .user_admin_service()
        .suggest_username(
            query.name.as_deref().unwrap_or_default(),
            query.email.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok(Json(ApiResponse::success(SuggestResponse { username })))
}

/// `PUT /api/admin/users/{user_id}/role`
pub async fn update_role(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(user_id): Path<i32>,
    Json(payload): Json<RoleRequest>,
) -> Result<Json<ApiResponse<RoleResponse>>, ApiError> {
    let user_id = validate_id(user_id, "user")?;
    let role = state
        .user_admin_service()
        .set_role(&actor, user_id, &payload.role)
        .await?;

    Ok(Json(ApiResponse::success(RoleResponse {
        message: "role updated",
        role,
    })))
}

/// `PUT /api/admin/users/{user_id}/status`. A missing `is_active` activates.
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(user_id): Path<i32>,
    payload: Option<Json<StatusRequest>>,
) -> Result<Json<ApiResponse<StatusResponse>>, ApiError> {
    let user_id = validate_id(user_id, "user")?;
    let is_active = payload.and_then(|Json(p)| p.is_active).unwrap_or(true);
    let is_active = state
        .user_admin_service()
        .set_status(&actor, user_id, is_active)
        .await?;

    Ok(Json(ApiResponse::success(StatusResponse {
        message: "status updated",
        is_active,
    })))
}

/// `POST /api/admin/users/{user_id}/reset-password`
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(user_id): Path<i32>,
    payload: Option<Json<ResetRequest>>,
) -> Result<Json<ApiResponse<ResetResponse>>, ApiError> {
    let user_id = validate_id(user_id, "user")?;
    let temp_password = payload.and_then(|Json(p)| p.temp_password);

    let reset = state
        .user_admin_service()
        .reset_password(&actor, user_id, temp_password)
        .await?;

    Ok(Json(ApiResponse::success(ResetResponse {
        message: "password reset issued",
        reset,
    })))
}
