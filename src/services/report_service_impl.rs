//! `SeaORM` implementation of the `ReportService` trait.

use async_trait::async_trait;
use chrono::{DateTime, Duration};

use crate::db::{MonthlyCost, Store};
use crate::domain::csv::CsvWriter;
use crate::domain::schedule::{self, format_date};
use crate::entities::{assets, maintenance_logs};
use crate::services::report_service::{
    ASSETS_CSV_HEADER, CsvExport, DashboardSummary, LOGS_CSV_HEADER, ReportError, ReportService,
    WarrantyItem,
};

pub struct SeaOrmReportService {
    store: Store,
    tz_offset_minutes: i32,
}

impl SeaOrmReportService {
    #[must_use]
    pub const fn new(store: Store, tz_offset_minutes: i32) -> Self {
        Self {
            store,
            tz_offset_minutes,
        }
    }

    fn today(&self) -> chrono::NaiveDate {
        schedule::today_at_offset(self.tz_offset_minutes)
    }
}

fn optional_date(date: Option<chrono::NaiveDate>) -> String {
    date.map(format_date).unwrap_or_default()
}

/// `created_at` is stored as RFC 3339; exports use `YYYY-MM-DD HH:MM:SS`.
fn export_timestamp(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

#[must_use]
pub fn render_assets_csv(assets: &[assets::Model]) -> String {
    let mut csv = CsvWriter::with_header(&ASSETS_CSV_HEADER);
    for asset in assets {
        csv.write_row([
            asset.id.to_string(),
            asset.name.clone(),
            asset.category.clone().unwrap_or_default(),
            asset.location.clone().unwrap_or_default(),
            optional_date(asset.purchase_date),
            optional_date(asset.warranty_end),
            asset.frequency_days.unwrap_or(0).to_string(),
        ]);
    }
    csv.finish()
}

#[must_use]
pub fn render_logs_csv(logs: &[maintenance_logs::Model]) -> String {
    let mut csv = CsvWriter::with_header(&LOGS_CSV_HEADER);
    for log in logs {
        csv.write_row([
            log.id.to_string(),
            log.asset_id.to_string(),
            format_date(log.service_date),
            log.description.clone().unwrap_or_default(),
            log.parts_used.clone().unwrap_or_default(),
            format!("{:?}", log.cost),
            log.technician_id.map(|id| id.to_string()).unwrap_or_default(),
            optional_date(log.next_service_due),
            export_timestamp(&log.created_at),
        ]);
    }
    csv.finish()
}

#[async_trait]
impl ReportService for SeaOrmReportService {
    async fn monthly_cost(&self) -> Result<Vec<MonthlyCost>, ReportError> {
        Ok(self.store.reports().monthly_cost(self.today()).await?)
    }

    async fn warranty_expiring(&self, days: i64) -> Result<Vec<WarrantyItem>, ReportError> {
        if days < 0 {
            return Err(ReportError::Validation(
                "'days' must be zero or positive".to_string(),
            ));
        }
        let today = self.today();
        let Some(deadline) = Duration::try_days(days).and_then(|d| today.checked_add_signed(d))
        else {
            return Err(ReportError::Validation(
                "Invalid 'days' parameter".to_string(),
            ));
        };

        let assets = self.store.assets().warranty_between(today, deadline).await?;
        Ok(assets
            .into_iter()
            .map(|a| WarrantyItem {
                id: a.id,
                name: a.name,
                category: a.category,
                warranty_end: a.warranty_end,
            })
            .collect())
    }

    async fn assets_csv(&self) -> Result<CsvExport, ReportError> {
        let assets = self.store.assets().list_all().await?;
        Ok(CsvExport {
            filename: "assets.csv",
            body: render_assets_csv(&assets),
        })
    }

    async fn logs_csv(&self) -> Result<CsvExport, ReportError> {
        let logs = self.store.maintenance().list_all().await?;
        Ok(CsvExport {
            filename: "maintenance_logs.csv",
            body: render_logs_csv(&logs),
        })
    }

    async fn dashboard(&self) -> Result<DashboardSummary, ReportError> {
        let maintenance = self.store.maintenance();
        Ok(DashboardSummary {
            total_assets: self.store.assets().count().await?,
            total_logs: maintenance.count().await?,
            overdue_logs: maintenance.count_overdue(self.today()).await?,
            monthly_cost: self.store.reports().cost_by_month_name().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn asset_export_columns_and_quoting() {
        let asset = assets::Model {
            id: 3,
            name: "Printer, 2nd floor".to_string(),
            category: Some("IT".to_string()),
            location: None,
            purchase_date: Some(date("2024-01-15")),
            warranty_end: None,
            frequency_days: None,
            assigned_user_id: None,
            qr_code_path: None,
            created_at: String::new(),
            updated_at: String::new(),
        };

        let csv = render_assets_csv(&[asset]);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("ID,Name,Category,Location,Purchase Date,Warranty End,Frequency Days")
        );
        assert_eq!(lines.next(), Some("3,\"Printer, 2nd floor\",IT,,2024-01-15,,0"));
    }

    #[test]
    fn log_export_formats_cost_and_timestamp() {
        let log = maintenance_logs::Model {
            id: 9,
            asset_id: 3,
            service_date: date("2025-08-17"),
            description: Some("Filter swap".to_string()),
            parts_used: None,
            cost: 120.0,
            attachment_path: None,
            next_service_due: Some(date("2026-02-13")),
            technician_id: None,
            created_at: "2025-08-17T10:30:00+00:00".to_string(),
        };

        let csv = render_logs_csv(&[log]);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some(
                "ID,Asset ID,Service Date,Description,Parts Used,Cost,Technician ID,Next Service Due,Created At"
            )
        );
        assert_eq!(
            lines.next(),
            Some("9,3,2025-08-17,Filter swap,,120.0,,2026-02-13,2025-08-17 10:30:00")
        );
    }
}
