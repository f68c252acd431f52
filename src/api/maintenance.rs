use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::types::double_option;
use super::validation::validate_id;
use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::domain::Actor;
use crate::services::{DueLog, LogInput, LogUpdate, LogView, MaintenanceError};

#[derive(Debug, Deserialize)]
pub struct CreateLogRequest {
    pub description: Option<String>,
    pub parts_used: Option<String>,
    pub cost: Option<f64>,
    pub service_date: Option<String>,
    pub next_service_due: Option<String>,
    pub attachment_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLogRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub parts_used: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub cost: Option<Option<f64>>,
    pub service_date: Option<String>,
    pub next_service_due: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub attachment_path: Option<Option<String>>,
}

#[derive(Debug, Serialize)]
pub struct LogCreatedResponse {
    pub message: &'static str,
    pub log: LogView,
}

impl From<MaintenanceError> for ApiError {
    fn from(err: MaintenanceError) -> Self {
        match err {
            MaintenanceError::AssetNotFound(id) => Self::not_found("Asset", id),
            MaintenanceError::LogNotFound(id) => Self::not_found("Maintenance log", id),
            MaintenanceError::Validation(msg) => Self::validation(msg),
            MaintenanceError::Database(msg) => Self::DatabaseError(msg),
        }
    }
}

/// `GET /api/assets/{asset_id}/maintenance`
pub async fn list_logs(
    State(state): State<Arc<AppState>>,
    Path(asset_id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<LogView>>>, ApiError> {
    let asset_id = validate_id(asset_id, "asset")?;
    let logs = state.maintenance_service().list_for_asset(asset_id).await?;
    Ok(Json(ApiResponse::success(logs)))
}

/// `POST /api/assets/{asset_id}/maintenance`
pub async fn create_log(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(asset_id): Path<i32>,
    Json(payload): Json<CreateLogRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let asset_id = validate_id(asset_id, "asset")?;
    let log = state
        .maintenance_service()
        .create(
            &actor,
            asset_id,
            LogInput {
                description: payload.description,
                parts_used: payload.parts_used,
                cost: payload.cost,
                service_date: payload.service_date,
                next_service_due: payload.next_service_due,
                attachment_path: payload.attachment_path,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(LogCreatedResponse {
            message: "Maintenance log added",
            log,
        })),
    ))
}

/// `PUT /api/maintenance/{log_id}`
pub async fn update_log(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(log_id): Path<i32>,
    Json(payload): Json<UpdateLogRequest>,
) -> Result<Json<ApiResponse<LogView>>, ApiError> {
    let log_id = validate_id(log_id, "log")?;
    let log = state
        .maintenance_service()
        .update(
            &actor,
            log_id,
            LogUpdate {
                description: payload.description,
                parts_used: payload.parts_used,
                cost: payload.cost,
                service_date: payload.service_date,
                next_service_due: payload.next_service_due,
                attachment_path: payload.attachment_path,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(log)))
}

/// `DELETE /api/maintenance/{log_id}`
pub async fn delete_log(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(log_id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let log_id = validate_id(log_id, "log")?;
    state.maintenance_service().delete(&actor, log_id).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new("Log deleted"))))
}

/// `GET /api/maintenance/due`
pub async fn list_due_logs(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<ApiResponse<Vec<DueLog>>>, ApiError> {
    let due = state.maintenance_service().due(&actor).await?;
    Ok(Json(ApiResponse::success(due)))
}
