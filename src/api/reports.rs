use axum::{
    Json,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::parse_optional_int;
use super::{ApiError, ApiResponse, AppState};
use crate::db::MonthlyCost;
use crate::services::report_service::DEFAULT_WARRANTY_WINDOW_DAYS;
use crate::services::{CsvExport, ReportError, WarrantyItem};

#[derive(Debug, Default, Deserialize)]
pub struct WarrantyQuery {
    pub days: Option<String>,
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::Validation(msg) => Self::validation(msg),
            ReportError::Database(msg) => Self::DatabaseError(msg),
        }
    }
}

/// `GET /api/reports/monthly-cost`
pub async fn monthly_cost(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<MonthlyCost>>>, ApiError> {
    let costs = state.report_service().monthly_cost().await?;
    Ok(Json(ApiResponse::success(costs)))
}

/// `GET /api/reports/warranty-expiring?days=30`
pub async fn warranty_expiring(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WarrantyQuery>,
) -> Result<Json<ApiResponse<Vec<WarrantyItem>>>, ApiError> {
    let days = parse_optional_int(query.days.as_deref(), "Invalid 'days' parameter")?
        .unwrap_or(DEFAULT_WARRANTY_WINDOW_DAYS);

    let items = state.report_service().warranty_expiring(days).await?;
    Ok(Json(ApiResponse::success(items)))
}

/// `GET /api/reports/assets/export`
pub async fn export_assets(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let export = state.report_service().assets_csv().await?;
    Ok(csv_attachment(export))
}

/// `GET /api/reports/logs/export`
pub async fn export_logs(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let export = state.report_service().logs_csv().await?;
    Ok(csv_attachment(export))
}

fn csv_attachment(export: CsvExport) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export.filename),
            ),
        ],
        export.body,
    )
        .into_response()
}
