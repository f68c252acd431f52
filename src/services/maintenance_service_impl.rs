//! `SeaORM` implementation of the `MaintenanceService` trait.

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::db::{AssetRepository, AuditRepository, LogPatch, MaintenanceRepository, NewLog, Store};
use crate::domain::schedule::{self, parse_date, parse_optional_date};
use crate::domain::{Actor, AuditAction, audit_entity};
use crate::services::maintenance_service::{
    DueLog, LogInput, LogUpdate, LogView, MaintenanceError, MaintenanceService,
};

pub struct SeaOrmMaintenanceService {
    store: Store,
    tz_offset_minutes: i32,
}

impl SeaOrmMaintenanceService {
    #[must_use]
    pub const fn new(store: Store, tz_offset_minutes: i32) -> Self {
        Self {
            store,
            tz_offset_minutes,
        }
    }
}

fn trimmed(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

fn check_cost(cost: f64) -> Result<f64, MaintenanceError> {
    if cost.is_finite() && cost >= 0.0 {
        Ok(cost)
    } else {
        Err(MaintenanceError::Validation(
            "cost must be a non-negative number".to_string(),
        ))
    }
}

/// Blank date strings leave the stored value unchanged.
fn parse_update_date(
    field: &'static str,
    value: Option<String>,
) -> Result<Option<chrono::NaiveDate>, MaintenanceError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => Ok(Some(parse_date(field, v)?)),
    }
}

#[async_trait]
impl MaintenanceService for SeaOrmMaintenanceService {
    async fn list_for_asset(&self, asset_id: i32) -> Result<Vec<LogView>, MaintenanceError> {
        if self.store.assets().get(asset_id).await?.is_none() {
            return Err(MaintenanceError::AssetNotFound(asset_id));
        }

        let logs = self.store.maintenance().list_for_asset(asset_id).await?;
        Ok(logs.into_iter().map(LogView::from).collect())
    }

    async fn create(
        &self,
        actor: &Actor,
        asset_id: i32,
        input: LogInput,
    ) -> Result<LogView, MaintenanceError> {
        let service_date = parse_optional_date("service_date", input.service_date.as_deref())?;
        let next_due = parse_optional_date("next_service_due", input.next_service_due.as_deref())?;
        let cost = check_cost(input.cost.unwrap_or(0.0))?;

        let txn = self.store.begin().await?;
        let asset = AssetRepository::new(&txn)
            .get(asset_id)
            .await?
            .ok_or(MaintenanceError::AssetNotFound(asset_id))?;

        let (service_date, next_service_due) = schedule::resolve_log_dates(
            service_date,
            next_due,
            asset.frequency_days,
            schedule::today_at_offset(self.tz_offset_minutes),
        );

        let log = MaintenanceRepository::new(&txn)
            .insert(NewLog {
                asset_id,
                service_date,
                description: trimmed(input.description),
                parts_used: trimmed(input.parts_used),
                cost,
                attachment_path: input.attachment_path.filter(|p| !p.trim().is_empty()),
                next_service_due,
                technician_id: actor.id,
            })
            .await?;

        AuditRepository::new(&txn)
            .record(
                Some(actor.id),
                audit_entity::MAINTENANCE_LOG,
                Some(log.id),
                AuditAction::Create,
                json!({
                    "asset_id": asset_id,
                    "service_date": log.service_date,
                    "next_service_due": log.next_service_due,
                    "cost": log.cost,
                }),
            )
            .await?;
        txn.commit().await?;

        info!(log_id = log.id, asset_id, user_id = actor.id, "Maintenance log added");
        Ok(log.into())
    }

    async fn update(
        &self,
        actor: &Actor,
        log_id: i32,
        update: LogUpdate,
    ) -> Result<LogView, MaintenanceError> {
        let patch = LogPatch {
            description: update.description.map(trimmed),
            parts_used: update.parts_used.map(trimmed),
            cost: update
                .cost
                .map(|c| check_cost(c.unwrap_or(0.0)))
                .transpose()?,
            attachment_path: update.attachment_path,
            service_date: parse_update_date("service_date", update.service_date)?,
            next_service_due: parse_update_date("next_service_due", update.next_service_due)?,
        };

        let txn = self.store.begin().await?;
        let repo = MaintenanceRepository::new(&txn);
        let log = repo
            .get(log_id)
            .await?
            .ok_or(MaintenanceError::LogNotFound(log_id))?;

        let changes = json!({
            "description": patch.description,
            "parts_used": patch.parts_used,
            "cost": patch.cost,
            "attachment_path": patch.attachment_path,
            "service_date": patch.service_date,
            "next_service_due": patch.next_service_due,
        });

        let log = repo.update(log, patch).await?;
        AuditRepository::new(&txn)
            .record(
                Some(actor.id),
                audit_entity::MAINTENANCE_LOG,
                Some(log_id),
                AuditAction::Update,
                changes,
            )
            .await?;
        txn.commit().await?;

        info!(log_id, user_id = actor.id, "Maintenance log updated");
        Ok(log.into())
    }

    async fn delete(&self, actor: &Actor, log_id: i32) -> Result<(), MaintenanceError> {
        let txn = self.store.begin().await?;
        let repo = MaintenanceRepository::new(&txn);
        let log = repo
            .get(log_id)
            .await?
            .ok_or(MaintenanceError::LogNotFound(log_id))?;

        repo.delete(log_id).await?;
        AuditRepository::new(&txn)
            .record(
                Some(actor.id),
                audit_entity::MAINTENANCE_LOG,
                Some(log_id),
                AuditAction::Delete,
                json!({ "asset_id": log.asset_id }),
            )
            .await?;
        txn.commit().await?;

        info!(log_id, user_id = actor.id, "Maintenance log deleted");
        Ok(())
    }

    async fn due(&self, actor: &Actor) -> Result<Vec<DueLog>, MaintenanceError> {
        let today = schedule::today_at_offset(self.tz_offset_minutes);
        let scope = actor.is_tech().then_some(actor.id);

        let rows = self
            .store
            .maintenance()
            .due_on_or_before(today, scope)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(log, asset)| DueLog {
                overdue: schedule::is_overdue(log.next_service_due, today),
                asset_name: asset.map(|a| a.name),
                log: log.into(),
            })
            .collect())
    }
}
