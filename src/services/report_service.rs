//! Read-only reporting: cost aggregates, warranty windows, CSV exports.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::db::MonthlyCost;
use crate::db::repositories::report::MonthNameCost;

pub const ASSETS_CSV_HEADER: [&str; 7] = [
    "ID",
    "Name",
    "Category",
    "Location",
    "Purchase Date",
    "Warranty End",
    "Frequency Days",
];

pub const LOGS_CSV_HEADER: [&str; 9] = [
    "ID",
    "Asset ID",
    "Service Date",
    "Description",
    "Parts Used",
    "Cost",
    "Technician ID",
    "Next Service Due",
    "Created At",
];

pub const DEFAULT_WARRANTY_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for ReportError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WarrantyItem {
    pub id: i32,
    pub name: String,
    pub category: Option<String>,
    pub warranty_end: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total_assets: u64,
    pub total_logs: u64,
    pub overdue_logs: u64,
    pub monthly_cost: Vec<MonthNameCost>,
}

/// A rendered CSV attachment.
#[derive(Debug, Clone)]
pub struct CsvExport {
    pub filename: &'static str,
    pub body: String,
}

#[async_trait::async_trait]
pub trait ReportService: Send + Sync {
    /// Cost per `(year, month)` over the last twelve months, ascending.
    async fn monthly_cost(&self) -> Result<Vec<MonthlyCost>, ReportError>;

    /// Assets with `today <= warranty_end <= today + days`.
    async fn warranty_expiring(&self, days: i64) -> Result<Vec<WarrantyItem>, ReportError>;

    async fn assets_csv(&self) -> Result<CsvExport, ReportError>;

    async fn logs_csv(&self) -> Result<CsvExport, ReportError>;

    async fn dashboard(&self) -> Result<DashboardSummary, ReportError>;
}
