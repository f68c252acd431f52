//! Asset registry endpoints.
//!
//! Handlers only map HTTP to [`AssetService`](crate::services::AssetService)
//! calls; role and ownership checks run in the route's policy layer.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::types::double_option;
use super::validation::{parse_optional_int, validate_id, validate_limit, validate_page};
use super::{ApiError, ApiResponse, AppState};
use crate::domain::Actor;
use crate::services::{
    AssetDeleted, AssetError, AssetInput, AssetListing, AssetQr, AssetQuery, AssetUpdate,
    AssetView, DashboardSummary, DueAsset, LogView,
};

#[derive(Debug, Default, Deserialize)]
pub struct AssetListQuery {
    pub location: Option<String>,
    pub category: Option<String>,
    pub assigned_user: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAssetRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub purchase_date: Option<String>,
    pub warranty_end: Option<String>,
    pub frequency_days: Option<i32>,
    pub assigned_user_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAssetRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub category: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub purchase_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub warranty_end: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub frequency_days: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_user_id: Option<Option<i32>>,
}

#[derive(Debug, Serialize)]
pub struct LatestLogResponse {
    pub asset_id: i32,
    pub latest_log: Option<LogView>,
}

impl From<AssetError> for ApiError {
    fn from(err: AssetError) -> Self {
        match err {
            AssetError::NotFound(id) => Self::not_found("Asset", id),
            AssetError::Validation(msg) => Self::validation(msg),
            AssetError::QrUnavailable(id) => {
                Self::NotFound(format!("QR code not available for asset {id}"))
            }
            AssetError::Database(msg) => Self::DatabaseError(msg),
            AssetError::Internal(msg) => Self::internal(msg),
        }
    }
}

/// `GET /api/assets`
pub async fn list_assets(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<AssetListQuery>,
) -> Result<Json<ApiResponse<AssetListing>>, ApiError> {
    let assigned_user = parse_optional_int(
        query.assigned_user.as_deref(),
        "assigned_user must be int",
    )?
    .map(i32::try_from)
    .transpose()
    .map_err(|_| ApiError::validation("assigned_user must be int"))?;

    let listing = state
        .asset_service()
        .list(
            &actor,
            AssetQuery {
                location: query.location,
                category: query.category,
                assigned_user,
                page: validate_page(query.page.as_deref())?,
                limit: validate_limit(query.limit.as_deref())?,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(listing)))
}

/// `POST /api/assets`
pub async fn create_asset(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<CreateAssetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let asset = state
        .asset_service()
        .create(
            &actor,
            AssetInput {
                name: payload.name,
                category: payload.category,
                location: payload.location,
                purchase_date: payload.purchase_date,
                warranty_end: payload.warranty_end,
                frequency_days: payload.frequency_days,
                assigned_user_id: payload.assigned_user_id,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(asset))))
}

/// `GET /api/assets/{asset_id}`
pub async fn get_asset(
    State(state): State<Arc<AppState>>,
    Path(asset_id): Path<i32>,
) -> Result<Json<ApiResponse<AssetView>>, ApiError> {
    let asset_id = validate_id(asset_id, "asset")?;
    let asset = state.asset_service().get(asset_id).await?;
    Ok(Json(ApiResponse::success(asset)))
}

/// `PUT /api/assets/{asset_id}`
pub async fn update_asset(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(asset_id): Path<i32>,
    Json(payload): Json<UpdateAssetRequest>,
) -> Result<Json<ApiResponse<AssetView>>, ApiError> {
    let asset_id = validate_id(asset_id, "asset")?;
    let asset = state
        .asset_service()
        .update(
            &actor,
            asset_id,
            AssetUpdate {
                name: payload.name,
                category: payload.category,
                location: payload.location,
                purchase_date: payload.purchase_date,
                warranty_end: payload.warranty_end,
                frequency_days: payload.frequency_days,
                assigned_user_id: payload.assigned_user_id,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(asset)))
}

/// `DELETE /api/assets/{asset_id}`
pub async fn delete_asset(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(asset_id): Path<i32>,
) -> Result<Json<ApiResponse<AssetDeleted>>, ApiError> {
    let asset_id = validate_id(asset_id, "asset")?;
    let deleted = state.asset_service().delete(&actor, asset_id).await?;
    Ok(Json(ApiResponse::success(deleted)))
}

/// `GET /api/assets/{asset_id}/qr`
pub async fn get_asset_qr(
    State(state): State<Arc<AppState>>,
    Path(asset_id): Path<i32>,
) -> Result<Json<ApiResponse<AssetQr>>, ApiError> {
    let asset_id = validate_id(asset_id, "asset")?;
    let qr = state.asset_service().qr(asset_id).await?;
    Ok(Json(ApiResponse::success(qr)))
}

/// `GET /api/assets/{asset_id}/latest-log`
pub async fn get_latest_log(
    State(state): State<Arc<AppState>>,
    Path(asset_id): Path<i32>,
) -> Result<Json<ApiResponse<LatestLogResponse>>, ApiError> {
    let asset_id = validate_id(asset_id, "asset")?;
    let latest_log = state.asset_service().latest_log(asset_id).await?;
    Ok(Json(ApiResponse::success(LatestLogResponse {
        asset_id,
        latest_log,
    })))
}

/// `GET /api/assets/due`
pub async fn list_due_assets(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<ApiResponse<Vec<DueAsset>>>, ApiError> {
    let due = state.asset_service().due(&actor).await?;
    Ok(Json(ApiResponse::success(due)))
}

/// `GET /api/assets/dashboard-summary`
pub async fn dashboard_summary(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<DashboardSummary>>, ApiError> {
    let summary = state.report_service().dashboard().await?;
    Ok(Json(ApiResponse::success(summary)))
}
