use chrono::{Datelike, Months, NaiveDate};
use sea_orm::{ConnectionTrait, DbErr, EntityTrait, QueryOrder};
use serde::Serialize;
use std::collections::BTreeMap;

use super::maintenance::MaintenanceRepository;
use crate::entities::maintenance_logs;

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyCost {
    pub year: i32,
    pub month: u32,
    pub total_cost: f64,
}

/// Cost bucketed by calendar month name, across years.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthNameCost {
    pub month: &'static str,
    pub cost: f64,
}

pub struct ReportRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> ReportRepository<'a, C> {
    #[must_use]
    pub const fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Total cost per `(year, month)` for logs serviced in the twelve months up to `today`.
    pub async fn monthly_cost(&self, today: NaiveDate) -> Result<Vec<MonthlyCost>, DbErr> {
        let since = today.checked_sub_months(Months::new(12)).unwrap_or(NaiveDate::MIN);
        let logs = MaintenanceRepository::new(self.db).serviced_since(since).await?;
        Ok(sum_by_year_month(&logs))
    }

    pub async fn cost_by_month_name(&self) -> Result<Vec<MonthNameCost>, DbErr> {
        let logs = maintenance_logs::Entity::find()
            .order_by_asc(maintenance_logs::Column::ServiceDate)
            .all(self.db)
            .await?;
        Ok(sum_by_month_name(&logs))
    }
}

#[must_use]
pub fn sum_by_year_month(logs: &[maintenance_logs::Model]) -> Vec<MonthlyCost> {
    let mut buckets: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for log in logs {
        let key = (log.service_date.year(), log.service_date.month());
        *buckets.entry(key).or_default() += log.cost;
    }

    buckets
        .into_iter()
        .map(|((year, month), total_cost)| MonthlyCost {
            year,
            month,
            total_cost,
        })
        .collect()
}

#[must_use]
pub fn sum_by_month_name(logs: &[maintenance_logs::Model]) -> Vec<MonthNameCost> {
    let mut buckets: BTreeMap<u32, f64> = BTreeMap::new();
    for log in logs {
        *buckets.entry(log.service_date.month0()).or_default() += log.cost;
    }

    buckets
        .into_iter()
        .map(|(month0, cost)| MonthNameCost {
            month: MONTH_NAMES[month0 as usize % 12],
            cost,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(id: i32, date: &str, cost: f64) -> maintenance_logs::Model {
        maintenance_logs::Model {
            id,
            asset_id: 1,
            service_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            description: None,
            parts_used: None,
            cost,
            attachment_path: None,
            next_service_due: None,
            technician_id: None,
            created_at: String::new(),
        }
    }

    #[test]
    fn groups_by_year_and_month_ascending() {
        let logs = vec![
            log(1, "2025-03-10", 100.0),
            log(2, "2024-12-01", 50.0),
            log(3, "2025-03-28", 25.5),
        ];
        let sums = sum_by_year_month(&logs);
        assert_eq!(
            sums,
            vec![
                MonthlyCost { year: 2024, month: 12, total_cost: 50.0 },
                MonthlyCost { year: 2025, month: 3, total_cost: 125.5 },
            ]
        );
    }

    #[test]
    fn month_names_merge_years() {
        let logs = vec![
            log(1, "2024-08-17", 200.0),
            log(2, "2025-08-01", 100.0),
            log(3, "2025-01-05", 10.0),
        ];
        let sums = sum_by_month_name(&logs);
        assert_eq!(sums.len(), 2);
        assert_eq!(sums[0], MonthNameCost { month: "Jan", cost: 10.0 });
        assert_eq!(sums[1], MonthNameCost { month: "Aug", cost: 300.0 });
    }
}
