//! Domain service for the maintenance ledger.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::domain::Actor;
use crate::domain::schedule::DateFormatError;
use crate::entities::maintenance_logs;

#[derive(Debug, Error)]
pub enum MaintenanceError {
    #[error("Asset {0} not found")]
    AssetNotFound(i32),

    #[error("Maintenance log {0} not found")]
    LogNotFound(i32),

    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for MaintenanceError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<DateFormatError> for MaintenanceError {
    fn from(err: DateFormatError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LogView {
    pub id: i32,
    pub asset_id: i32,
    pub service_date: NaiveDate,
    pub description: Option<String>,
    pub parts_used: Option<String>,
    pub cost: f64,
    pub technician_id: Option<i32>,
    pub attachment_path: Option<String>,
    pub next_service_due: Option<NaiveDate>,
    pub created_at: String,
}

impl From<maintenance_logs::Model> for LogView {
    fn from(log: maintenance_logs::Model) -> Self {
        Self {
            id: log.id,
            asset_id: log.asset_id,
            service_date: log.service_date,
            description: log.description,
            parts_used: log.parts_used,
            cost: log.cost,
            technician_id: log.technician_id,
            attachment_path: log.attachment_path,
            next_service_due: log.next_service_due,
            created_at: log.created_at,
        }
    }
}

/// A due log together with the name of its asset.
#[derive(Debug, Clone, Serialize)]
pub struct DueLog {
    #[serde(flatten)]
    pub log: LogView,
    pub asset_name: Option<String>,
    pub overdue: bool,
}

/// Create payload. Dates are raw `YYYY-MM-DD` strings.
#[derive(Debug, Clone, Default)]
pub struct LogInput {
    pub description: Option<String>,
    pub parts_used: Option<String>,
    pub cost: Option<f64>,
    pub service_date: Option<String>,
    pub next_service_due: Option<String>,
    pub attachment_path: Option<String>,
}

/// Partial update; absent fields are left alone, blank dates are ignored.
#[derive(Debug, Clone, Default)]
pub struct LogUpdate {
    pub description: Option<Option<String>>,
    pub parts_used: Option<Option<String>>,
    pub cost: Option<Option<f64>>,
    pub service_date: Option<String>,
    pub next_service_due: Option<String>,
    pub attachment_path: Option<Option<String>>,
}

/// Domain service trait for maintenance logs.
///
/// Role and ownership checks happen before these methods are called.
#[async_trait::async_trait]
pub trait MaintenanceService: Send + Sync {
    /// Logs of one asset, newest service date first.
    async fn list_for_asset(&self, asset_id: i32) -> Result<Vec<LogView>, MaintenanceError>;

    /// Records a service event performed by `actor`.
    ///
    /// `next_service_due` defaults to `service_date + frequency_days` of the asset.
    async fn create(
        &self,
        actor: &Actor,
        asset_id: i32,
        input: LogInput,
    ) -> Result<LogView, MaintenanceError>;

    async fn update(
        &self,
        actor: &Actor,
        log_id: i32,
        update: LogUpdate,
    ) -> Result<LogView, MaintenanceError>;

    async fn delete(&self, actor: &Actor, log_id: i32) -> Result<(), MaintenanceError>;

    /// Logs with `next_service_due` on or before today. TECH actors only see
    /// logs on their assigned assets.
    async fn due(&self, actor: &Actor) -> Result<Vec<DueLog>, MaintenanceError>;
}
