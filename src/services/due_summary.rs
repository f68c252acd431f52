//! Daily summary of due and overdue maintenance.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::Write;
use tracing::info;

use crate::db::Store;
use crate::domain::schedule;

#[derive(Debug, Clone, Serialize)]
pub struct DueSummaryItem {
    pub log_id: i32,
    pub asset_id: i32,
    pub asset_name: Option<String>,
    pub next_service_due: Option<NaiveDate>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DueSummary {
    pub date: NaiveDate,
    pub count: usize,
    pub items: Vec<DueSummaryItem>,
}

impl DueSummary {
    /// Plain-text rendering used for the log record.
    #[must_use]
    pub fn render(&self) -> String {
        if self.items.is_empty() {
            return "No due or overdue maintenance logs today".to_string();
        }

        let mut out = format!("{} maintenance logs due/overdue:\n", self.count);
        for item in &self.items {
            let due = item
                .next_service_due
                .map(schedule::format_date)
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "- Asset ID: {} | Due on: {} | Description: {}",
                item.asset_id,
                due,
                item.description.as_deref().unwrap_or("")
            );
        }
        out
    }
}

#[derive(Clone)]
pub struct DueSummaryService {
    store: Store,
    tz_offset_minutes: i32,
}

impl DueSummaryService {
    #[must_use]
    pub const fn new(store: Store, tz_offset_minutes: i32) -> Self {
        Self {
            store,
            tz_offset_minutes,
        }
    }

    /// Builds and logs the summary for today in the configured offset.
    pub async fn run(&self) -> Result<DueSummary> {
        let today = schedule::today_at_offset(self.tz_offset_minutes);
        self.run_for(today).await
    }

    pub async fn run_for(&self, today: NaiveDate) -> Result<DueSummary> {
        let rows = self
            .store
            .maintenance()
            .due_on_or_before(today, None)
            .await
            .context("Failed to query due maintenance logs")?;

        let items: Vec<DueSummaryItem> = rows
            .into_iter()
            .map(|(log, asset)| DueSummaryItem {
                log_id: log.id,
                asset_id: log.asset_id,
                asset_name: asset.map(|a| a.name),
                next_service_due: log.next_service_due,
                description: log.description,
            })
            .collect();

        let summary = DueSummary {
            date: today,
            count: items.len(),
            items,
        };

        info!(
            event = "due_summary",
            date = %summary.date,
            count = summary.count,
            "Daily maintenance summary\n{}",
            summary.render()
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_summary_message() {
        let summary = DueSummary {
            date: NaiveDate::from_ymd_opt(2025, 8, 17).unwrap(),
            count: 0,
            items: Vec::new(),
        };
        assert_eq!(summary.render(), "No due or overdue maintenance logs today");
    }

    #[test]
    fn summary_lists_each_log() {
        let summary = DueSummary {
            date: NaiveDate::from_ymd_opt(2025, 8, 17).unwrap(),
            count: 1,
            items: vec![DueSummaryItem {
                log_id: 4,
                asset_id: 2,
                asset_name: Some("AC Unit".to_string()),
                next_service_due: NaiveDate::from_ymd_opt(2025, 8, 10),
                description: Some("Filter".to_string()),
            }],
        };
        let text = summary.render();
        assert!(text.starts_with("1 maintenance logs due/overdue"));
        assert!(text.contains("Asset ID: 2 | Due on: 2025-08-10 | Description: Filter"));
    }
}
