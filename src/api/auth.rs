use axum::{
    Extension, Json,
    extract::{RawPathParams, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::db::Store;
use crate::domain::{Actor, Ownership, OwnershipFacts, Policy, Role};
use crate::services::{AuthError, LoginResult, Registration, UserProfile};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub role: Role,
    pub must_change_password: bool,
    pub is_active: bool,
    pub name: String,
    pub email: String,
}

impl From<LoginResult> for LoginResponse {
    fn from(result: LoginResult) -> Self {
        Self {
            access_token: result.access_token,
            role: result.role,
            must_change_password: result.must_change_password,
            is_active: result.is_active,
            name: result.name,
            email: result.email,
        }
    }
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub new_password: String,
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::unauthorized("Invalid credentials"),
            AuthError::AccountDisabled => Self::Forbidden("Account disabled".to_string()),
            AuthError::RegistrationDisabled => {
                Self::Forbidden("Self-registration is disabled".to_string())
            }
            AuthError::UserNotFound => Self::NotFound("User not found".to_string()),
            AuthError::Validation(msg) => Self::validation(msg),
            AuthError::Conflict(msg) => Self::Conflict(msg),
            AuthError::Database(msg) => Self::DatabaseError(msg),
            AuthError::Internal(msg) => Self::internal(msg),
        }
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Verifies `Authorization: Bearer <token>` and stores the [`Actor`] in the
/// request extensions.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token =
        bearer_token(&headers).ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

    let actor = state
        .auth_service()
        .authenticate(token)
        .map_err(|_| ApiError::unauthorized("Invalid or expired token"))?;

    tracing::Span::current().record("user_id", actor.id);
    request.extensions_mut().insert(actor);

    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// State for [`enforce_policy`]: the route's declared policy.
#[derive(Clone)]
pub struct PolicyGuard {
    pub state: Arc<AppState>,
    pub policy: Policy,
}

/// Evaluates the route's role allow-list and, for TECH actors, its ownership rule.
///
/// Runs after [`auth_middleware`]; the target row is named by a path parameter.
pub async fn enforce_policy(
    State(guard): State<PolicyGuard>,
    params: RawPathParams,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let actor = request
        .extensions()
        .get::<Actor>()
        .copied()
        .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

    guard.policy.check_role(&actor)?;

    if let Some(ownership) = guard.policy.needs_ownership(&actor) {
        let id = params
            .iter()
            .find(|(name, _)| *name == ownership.path_param())
            .and_then(|(_, value)| value.parse::<i32>().ok())
            .ok_or_else(|| ApiError::validation("Invalid path parameter"))?;

        let facts = ownership_facts(guard.state.store(), ownership, id).await?;
        guard.policy.check(&actor, facts)?;
    }

    Ok(next.run(request).await)
}

async fn ownership_facts(
    store: &Store,
    ownership: Ownership,
    id: i32,
) -> Result<OwnershipFacts, ApiError> {
    match ownership {
        Ownership::AssignedAsset => {
            let asset = store
                .assets()
                .get(id)
                .await?
                .ok_or_else(|| ApiError::not_found("Asset", id))?;
            Ok(OwnershipFacts {
                assigned_user_id: asset.assigned_user_id,
                technician_id: None,
            })
        }
        Ownership::OwnLog => {
            let (log, asset) = store
                .maintenance()
                .get_with_asset(id)
                .await?
                .ok_or_else(|| ApiError::not_found("Maintenance log", id))?;
            Ok(OwnershipFacts {
                assigned_user_id: asset.and_then(|a| a.assigned_user_id),
                technician_id: log.technician_id,
            })
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/login
/// Accepts an email or a username; wrong credentials never return a token
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let login = payload
        .email
        .or(payload.username)
        .unwrap_or_default();

    let result = state
        .auth_service()
        .login(&login, &payload.password)
        .await?;

    Ok(Json(ApiResponse::success(result.into())))
}

/// POST /auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state
        .auth_service()
        .register(Registration {
            name: payload.name,
            email: payload.email,
            password: payload.password,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(profile))))
}

/// GET /auth/me
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    let profile = state.auth_service().profile(actor.id).await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// POST /auth/change-password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .auth_service()
        .change_password(actor.id, &payload.new_password)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Password updated successfully",
    ))))
}
