//! `SeaORM` implementation of the `AssetService` trait.

use async_trait::async_trait;
use sea_orm::ConnectionTrait;
use serde_json::json;
use tracing::{info, warn};

use crate::db::{
    AssetFields, AssetFilter, AssetPatch, AssetRepository, AuditRepository, MaintenanceRepository,
    Store, UserRepository,
};
use crate::domain::schedule::{self, parse_optional_date};
use crate::domain::{Actor, AuditAction, audit_entity};
use crate::entities::assets;
use crate::services::asset_service::{
    AssetDeleted, AssetError, AssetInput, AssetListing, AssetQr, AssetQuery, AssetService,
    AssetUpdate, AssetView, DueAsset,
};
use crate::services::maintenance_service::LogView;
use crate::services::storage::{FileStorage, qr_filename};

pub struct SeaOrmAssetService {
    store: Store,
    storage: FileStorage,
    tz_offset_minutes: i32,
}

impl SeaOrmAssetService {
    #[must_use]
    pub const fn new(store: Store, storage: FileStorage, tz_offset_minutes: i32) -> Self {
        Self {
            store,
            storage,
            tz_offset_minutes,
        }
    }

    fn view(&self, asset: assets::Model) -> AssetView {
        AssetView::from_model(asset, &self.storage)
    }

    /// Writes the QR image and records its path. Failures are logged, never returned.
    async fn refresh_qr<C: ConnectionTrait>(&self, db: &C, asset: &mut assets::Model) {
        match self.storage.write_qr(asset.id).await {
            Ok(file) => {
                if let Err(e) = AssetRepository::new(db).set_qr_path(asset.id, &file).await {
                    warn!(asset_id = asset.id, error = %e, "Failed to store QR path");
                } else {
                    asset.qr_code_path = Some(file);
                }
            }
            Err(e) => warn!(asset_id = asset.id, error = %e, "QR generation failed"),
        }
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_frequency(frequency_days: Option<i32>) -> Result<(), AssetError> {
    match frequency_days {
        Some(days) if days <= 0 => Err(AssetError::Validation(
            "frequency_days must be a positive number of days".to_string(),
        )),
        _ => Ok(()),
    }
}

async fn check_assignee<C: ConnectionTrait>(db: &C, user_id: Option<i32>) -> Result<(), AssetError> {
    if let Some(user_id) = user_id
        && UserRepository::new(db).get_by_id(user_id).await?.is_none()
    {
        return Err(AssetError::Validation(format!(
            "assigned_user_id {user_id} does not reference an existing user"
        )));
    }
    Ok(())
}

#[async_trait]
impl AssetService for SeaOrmAssetService {
    async fn list(&self, actor: &Actor, query: AssetQuery) -> Result<AssetListing, AssetError> {
        let filter = AssetFilter {
            location: clean(query.location),
            category: clean(query.category),
            assigned_user_id: query.assigned_user,
            scope_to_user: actor.is_tech().then_some(actor.id),
        };

        let page = self
            .store
            .assets()
            .list(&filter, query.page, query.limit)
            .await?;

        Ok(AssetListing {
            items: page.items.into_iter().map(|a| self.view(a)).collect(),
            total: page.total,
            page: query.page,
            pages: page.pages,
        })
    }

    async fn get(&self, id: i32) -> Result<AssetView, AssetError> {
        let asset = self
            .store
            .assets()
            .get(id)
            .await?
            .ok_or(AssetError::NotFound(id))?;
        Ok(self.view(asset))
    }

    async fn create(&self, actor: &Actor, input: AssetInput) -> Result<AssetView, AssetError> {
        let name = clean(input.name)
            .ok_or_else(|| AssetError::Validation("name is required".to_string()))?;
        check_frequency(input.frequency_days)?;

        let fields = AssetFields {
            name,
            category: clean(input.category),
            location: clean(input.location),
            purchase_date: parse_optional_date("purchase_date", input.purchase_date.as_deref())?,
            warranty_end: parse_optional_date("warranty_end", input.warranty_end.as_deref())?,
            frequency_days: Some(input.frequency_days.unwrap_or(schedule::DEFAULT_FREQUENCY_DAYS)),
            assigned_user_id: input.assigned_user_id,
        };

        let txn = self.store.begin().await?;
        check_assignee(&txn, fields.assigned_user_id).await?;

        let mut asset = AssetRepository::new(&txn).insert(fields).await?;
        self.refresh_qr(&txn, &mut asset).await;

        AuditRepository::new(&txn)
            .record(
                Some(actor.id),
                audit_entity::ASSET,
                Some(asset.id),
                AuditAction::Create,
                json!({
                    "name": asset.name,
                    "category": asset.category,
                    "location": asset.location,
                    "assigned_user_id": asset.assigned_user_id,
                }),
            )
            .await?;
        txn.commit().await?;

        info!(asset_id = asset.id, user_id = actor.id, "Asset created");
        Ok(self.view(asset))
    }

    async fn update(
        &self,
        actor: &Actor,
        id: i32,
        update: AssetUpdate,
    ) -> Result<AssetView, AssetError> {
        let name = match update.name {
            Some(name) => Some(
                clean(Some(name))
                    .ok_or_else(|| AssetError::Validation("name cannot be empty".to_string()))?,
            ),
            None => None,
        };
        if let Some(frequency_days) = update.frequency_days {
            check_frequency(frequency_days)?;
        }

        let patch = AssetPatch {
            name,
            category: update.category.map(clean),
            location: update.location.map(clean),
            purchase_date: update
                .purchase_date
                .map(|d| parse_optional_date("purchase_date", d.as_deref()))
                .transpose()?,
            warranty_end: update
                .warranty_end
                .map(|d| parse_optional_date("warranty_end", d.as_deref()))
                .transpose()?,
            frequency_days: update.frequency_days,
            assigned_user_id: update.assigned_user_id,
        };

        let txn = self.store.begin().await?;
        let repo = AssetRepository::new(&txn);
        let existing = repo.get(id).await?.ok_or(AssetError::NotFound(id))?;
        if let Some(assignee) = patch.assigned_user_id {
            check_assignee(&txn, assignee).await?;
        }

        let changes = touched_columns(&patch);

        let mut asset = repo.update(existing, patch).await?;
        self.refresh_qr(&txn, &mut asset).await;

        AuditRepository::new(&txn)
            .record(
                Some(actor.id),
                audit_entity::ASSET,
                Some(id),
                AuditAction::Update,
                changes,
            )
            .await?;
        txn.commit().await?;

        info!(asset_id = id, user_id = actor.id, "Asset updated");
        Ok(self.view(asset))
    }

    async fn delete(&self, actor: &Actor, id: i32) -> Result<AssetDeleted, AssetError> {
        let txn = self.store.begin().await?;
        let repo = AssetRepository::new(&txn);
        let asset = repo.get(id).await?.ok_or(AssetError::NotFound(id))?;

        let logs_deleted = repo.delete_cascade(id).await?;

        AuditRepository::new(&txn)
            .record(
                Some(actor.id),
                audit_entity::ASSET,
                Some(id),
                AuditAction::Delete,
                json!({ "name": asset.name, "logs_deleted": logs_deleted }),
            )
            .await?;
        txn.commit().await?;

        info!(asset_id = id, logs_deleted, user_id = actor.id, "Asset deleted");
        Ok(AssetDeleted { id, logs_deleted })
    }

    async fn qr(&self, id: i32) -> Result<AssetQr, AssetError> {
        let mut asset = self
            .store
            .assets()
            .get(id)
            .await?
            .ok_or(AssetError::NotFound(id))?;

        let on_disk = match &asset.qr_code_path {
            Some(path) => self.storage.qr_exists(path).await,
            None => false,
        };
        if !on_disk {
            self.refresh_qr(&self.store.conn, &mut asset).await;
        }

        let qr_code_path = asset.qr_code_path.ok_or(AssetError::QrUnavailable(id))?;
        Ok(AssetQr {
            asset_id: id,
            qr_url: self.storage.qr_url(Some(&qr_code_path)),
            qr_code_path,
            payload: self.storage.qr_payload(id),
        })
    }

    async fn qr_file(&self, id: i32) -> Result<String, AssetError> {
        let asset = self
            .store
            .assets()
            .get(id)
            .await?
            .ok_or(AssetError::NotFound(id))?;

        let path = asset.qr_code_path.ok_or(AssetError::QrUnavailable(id))?;
        let name = std::path::Path::new(&path)
            .file_name()
            .and_then(|n| n.to_str())
            .map_or_else(|| qr_filename(id), ToString::to_string);
        Ok(name)
    }

    async fn latest_log(&self, id: i32) -> Result<Option<LogView>, AssetError> {
        if self.store.assets().get(id).await?.is_none() {
            return Err(AssetError::NotFound(id));
        }
        let log = self.store.maintenance().latest_for_asset(id).await?;
        Ok(log.map(LogView::from))
    }

    async fn due(&self, actor: &Actor) -> Result<Vec<DueAsset>, AssetError> {
        let today = schedule::today_at_offset(self.tz_offset_minutes);
        let scope = actor.is_tech().then_some(actor.id);

        let rows = MaintenanceRepository::new(&self.store.conn)
            .latest_due_per_asset(today, scope)
            .await?;

        let due = rows
            .into_iter()
            .filter_map(|(log, asset)| {
                let asset = asset?;
                Some(DueAsset {
                    overdue: schedule::is_overdue(log.next_service_due, today),
                    asset: self.view(asset),
                    latest_log: LogView::from(log),
                })
            })
            .collect();
        Ok(due)
    }
}

/// Lists only the columns the patch sets. A cleared column is recorded as `null`.
fn touched_columns(patch: &AssetPatch) -> serde_json::Value {
    let mut changes = serde_json::Map::new();
    touch(&mut changes, "name", patch.name.as_ref());
    touch(&mut changes, "category", patch.category.as_ref());
    touch(&mut changes, "location", patch.location.as_ref());
    touch(&mut changes, "purchase_date", patch.purchase_date.as_ref());
    touch(&mut changes, "warranty_end", patch.warranty_end.as_ref());
    touch(&mut changes, "frequency_days", patch.frequency_days.as_ref());
    touch(&mut changes, "assigned_user_id", patch.assigned_user_id.as_ref());
    serde_json::Value::Object(changes)
}

fn touch<T: serde::Serialize>(
    changes: &mut serde_json::Map<String, serde_json::Value>,
    column: &str,
    value: Option<&T>,
) {
    if let Some(value) = value {
        changes.insert(column.to_string(), json!(value));
    }
}
