use chrono::NaiveDate;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::entities::{assets, maintenance_logs};

#[derive(Debug, Clone)]
pub struct NewLog {
    pub asset_id: i32,
    pub service_date: NaiveDate,
    pub description: String,
    pub parts_used: String,
    pub cost: f64,
    pub attachment_path: Option<String>,
    pub next_service_due: NaiveDate,
    pub technician_id: i32,
}

#[derive(Debug, Clone, Default)]
pub struct LogPatch {
    pub description: Option<String>,
    pub parts_used: Option<String>,
    pub cost: Option<f64>,
    pub attachment_path: Option<Option<String>>,
    pub service_date: Option<NaiveDate>,
    pub next_service_due: Option<NaiveDate>,
}

/// A log joined with the asset it belongs to.
pub type LogWithAsset = (maintenance_logs::Model, Option<assets::Model>);

pub struct MaintenanceRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> MaintenanceRepository<'a, C> {
    #[must_use]
    pub const fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn get(&self, id: i32) -> Result<Option<maintenance_logs::Model>, DbErr> {
        maintenance_logs::Entity::find_by_id(id).one(self.db).await
    }

    pub async fn get_with_asset(&self, id: i32) -> Result<Option<LogWithAsset>, DbErr> {
        maintenance_logs::Entity::find_by_id(id)
            .find_also_related(assets::Entity)
            .one(self.db)
            .await
    }

    /// Newest service date first.
    pub async fn list_for_asset(&self, asset_id: i32) -> Result<Vec<maintenance_logs::Model>, DbErr> {
        maintenance_logs::Entity::find()
            .filter(maintenance_logs::Column::AssetId.eq(asset_id))
            .order_by_desc(maintenance_logs::Column::ServiceDate)
            .order_by_desc(maintenance_logs::Column::Id)
            .all(self.db)
            .await
    }

    pub async fn latest_for_asset(
        &self,
        asset_id: i32,
    ) -> Result<Option<maintenance_logs::Model>, DbErr> {
        maintenance_logs::Entity::find()
            .filter(maintenance_logs::Column::AssetId.eq(asset_id))
            .order_by_desc(maintenance_logs::Column::ServiceDate)
            .order_by_desc(maintenance_logs::Column::Id)
            .one(self.db)
            .await
    }

    pub async fn count_for_asset(&self, asset_id: i32) -> Result<u64, DbErr> {
        maintenance_logs::Entity::find()
            .filter(maintenance_logs::Column::AssetId.eq(asset_id))
            .count(self.db)
            .await
    }

    /// Logs with `next_service_due <= today`, soonest first.
    ///
    /// With `assigned_to`, only logs on assets assigned to that user are returned.
    pub async fn due_on_or_before(
        &self,
        today: NaiveDate,
        assigned_to: Option<i32>,
    ) -> Result<Vec<LogWithAsset>, DbErr> {
        let mut query = maintenance_logs::Entity::find()
            .find_also_related(assets::Entity)
            .filter(maintenance_logs::Column::NextServiceDue.lte(today));

        if let Some(user_id) = assigned_to {
            query = query.filter(assets::Column::AssignedUserId.eq(user_id));
        }

        query
            .order_by_asc(maintenance_logs::Column::NextServiceDue)
            .order_by_asc(maintenance_logs::Column::Id)
            .all(self.db)
            .await
    }

    pub async fn count(&self) -> Result<u64, DbErr> {
        maintenance_logs::Entity::find().count(self.db).await
    }

    pub async fn count_overdue(&self, today: NaiveDate) -> Result<u64, DbErr> {
        maintenance_logs::Entity::find()
            .filter(maintenance_logs::Column::NextServiceDue.lt(today))
            .count(self.db)
            .await
    }

    /// The newest log of each asset, kept only when its `next_service_due <= today`.
    ///
    /// "Newest" is the highest `service_date`, ties broken by id.
    pub async fn latest_due_per_asset(
        &self,
        today: NaiveDate,
        assigned_to: Option<i32>,
    ) -> Result<Vec<LogWithAsset>, DbErr> {
        let mut query = maintenance_logs::Entity::find()
            .find_also_related(assets::Entity)
            .filter(Expr::cust(
                "NOT EXISTS (SELECT 1 FROM maintenance_logs AS newer \
                 WHERE newer.asset_id = maintenance_logs.asset_id \
                 AND (newer.service_date > maintenance_logs.service_date \
                 OR (newer.service_date = maintenance_logs.service_date \
                 AND newer.id > maintenance_logs.id)))",
            ))
            .filter(maintenance_logs::Column::NextServiceDue.lte(today));

        if let Some(user_id) = assigned_to {
            query = query.filter(assets::Column::AssignedUserId.eq(user_id));
        }

        query
            .order_by_asc(maintenance_logs::Column::NextServiceDue)
            .order_by_asc(maintenance_logs::Column::AssetId)
            .all(self.db)
            .await
    }

    pub async fn list_all(&self) -> Result<Vec<maintenance_logs::Model>, DbErr> {
        maintenance_logs::Entity::find()
            .order_by_asc(maintenance_logs::Column::Id)
            .all(self.db)
            .await
    }

    pub async fn serviced_since(
        &self,
        since: NaiveDate,
    ) -> Result<Vec<maintenance_logs::Model>, DbErr> {
        maintenance_logs::Entity::find()
            .filter(maintenance_logs::Column::ServiceDate.gte(since))
            .order_by_asc(maintenance_logs::Column::ServiceDate)
            .all(self.db)
            .await
    }

    pub async fn insert(&self, log: NewLog) -> Result<maintenance_logs::Model, DbErr> {
        maintenance_logs::ActiveModel {
            asset_id: Set(log.asset_id),
            service_date: Set(log.service_date),
            description: Set(Some(log.description)),
            parts_used: Set(Some(log.parts_used)),
            cost: Set(log.cost),
            attachment_path: Set(log.attachment_path),
            next_service_due: Set(Some(log.next_service_due)),
            technician_id: Set(Some(log.technician_id)),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(self.db)
        .await
    }

    pub async fn update(
        &self,
        log: maintenance_logs::Model,
        patch: LogPatch,
    ) -> Result<maintenance_logs::Model, DbErr> {
        let mut active: maintenance_logs::ActiveModel = log.into();

        if let Some(description) = patch.description {
            active.description = Set(Some(description));
        }
        if let Some(parts_used) = patch.parts_used {
            active.parts_used = Set(Some(parts_used));
        }
        if let Some(cost) = patch.cost {
            active.cost = Set(cost);
        }
        if let Some(attachment_path) = patch.attachment_path {
            active.attachment_path = Set(attachment_path);
        }
        if let Some(service_date) = patch.service_date {
            active.service_date = Set(service_date);
        }
        if let Some(next_due) = patch.next_service_due {
            active.next_service_due = Set(Some(next_due));
        }

        active.update(self.db).await
    }

    pub async fn delete(&self, id: i32) -> Result<bool, DbErr> {
        let result = maintenance_logs::Entity::delete_by_id(id).exec(self.db).await?;
        Ok(result.rows_affected > 0)
    }
}
