use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde_json::Value;

use crate::domain::AuditAction;
use crate::entities::audit_log;

pub use crate::entities::audit_log::Model as AuditEntry;

pub struct AuditRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> AuditRepository<'a, C> {
    #[must_use]
    pub const fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Appends one entry. Call with the transaction that performs the mutation.
    pub async fn record(
        &self,
        user_id: Option<i32>,
        entity: &str,
        entity_id: Option<i32>,
        action: AuditAction,
        changes: Value,
    ) -> Result<(), DbErr> {
        let changes = (!changes.is_null()).then(|| changes.to_string());

        audit_log::ActiveModel {
            user_id: Set(user_id),
            entity: Set(entity.to_string()),
            entity_id: Set(entity_id),
            action: Set(action.as_str().to_string()),
            changes: Set(changes),
            at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(self.db)
        .await?;

        Ok(())
    }

    /// Newest first. `page` is 1-based.
    pub async fn list(
        &self,
        entity: Option<&str>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<AuditEntry>, u64), DbErr> {
        let mut query = audit_log::Entity::find();
        if let Some(entity) = entity {
            query = query.filter(audit_log::Column::Entity.eq(entity));
        }

        let paginator = query
            .order_by_desc(audit_log::Column::Id)
            .paginate(self.db, limit);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((items, total))
    }

    pub async fn count_for(&self, entity: &str, action: AuditAction) -> Result<u64, DbErr> {
        audit_log::Entity::find()
            .filter(audit_log::Column::Entity.eq(entity))
            .filter(audit_log::Column::Action.eq(action.as_str()))
            .count(self.db)
            .await
    }
}
