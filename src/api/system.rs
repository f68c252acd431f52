//! Operational endpoints: banner, health, manual due summary, audit trail.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::validation::{validate_limit, validate_page};
use super::{ApiError, ApiResponse, AppState};
use crate::db::AuditEntry;
use crate::services::DueSummary;

#[derive(Debug, Serialize)]
pub struct BannerResponse {
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub db: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    pub entity: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuditView {
    pub id: i64,
    pub user_id: Option<i32>,
    pub entity: String,
    pub entity_id: Option<i32>,
    pub action: String,
    pub changes: Option<serde_json::Value>,
    pub at: String,
}

impl From<AuditEntry> for AuditView {
    fn from(entry: AuditEntry) -> Self {
        Self {
            id: entry.id,
            user_id: entry.user_id,
            entity: entry.entity,
            entity_id: entry.entity_id,
            action: entry.action,
            changes: entry
                .changes
                .as_deref()
                .and_then(|c| serde_json::from_str(c).ok()),
            at: entry.at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuditPage {
    pub items: Vec<AuditView>,
    pub total: u64,
    pub page: u64,
}

/// `GET /`
pub async fn banner() -> Json<BannerResponse> {
    Json(BannerResponse {
        service: "SmartAsset API",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /health`. 503 when the database does not answer.
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let db = state.store().ping().await.is_ok();
    let status = if db {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if db { "ok" } else { "degraded" },
            db,
        }),
    )
        .into_response()
}

/// `POST /api/system/tasks/due-summary`
pub async fn trigger_due_summary(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<DueSummary>>, ApiError> {
    let summary = state.due_summary().run().await?;
    Ok(Json(ApiResponse::success(summary)))
}

/// `GET /api/audit?entity=&page=&limit=`
pub async fn list_audit(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<ApiResponse<AuditPage>>, ApiError> {
    let page = validate_page(query.page.as_deref())?;
    let limit = validate_limit(query.limit.as_deref())?;
    let entity = query.entity.as_deref().map(str::trim).filter(|e| !e.is_empty());

    let (items, total) = state.store().audit().list(entity, page, limit).await?;

    Ok(Json(ApiResponse::success(AuditPage {
        items: items.into_iter().map(AuditView::from).collect(),
        total,
        page,
    })))
}
