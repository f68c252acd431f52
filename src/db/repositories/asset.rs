use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::entities::{assets, maintenance_logs};

#[derive(Debug, Clone, Default)]
pub struct AssetFilter {
    pub location: Option<String>,
    pub category: Option<String>,
    pub assigned_user_id: Option<i32>,
    /// Restricts results to assets assigned to this user regardless of other filters.
    pub scope_to_user: Option<i32>,
}

impl AssetFilter {
    fn condition(&self) -> Condition {
        let mut cond = Condition::all();
        if let Some(location) = &self.location {
            cond = cond.add(assets::Column::Location.eq(location.as_str()));
        }
        if let Some(category) = &self.category {
            cond = cond.add(assets::Column::Category.eq(category.as_str()));
        }
        if let Some(user_id) = self.assigned_user_id {
            cond = cond.add(assets::Column::AssignedUserId.eq(user_id));
        }
        if let Some(user_id) = self.scope_to_user {
            cond = cond.add(assets::Column::AssignedUserId.eq(user_id));
        }
        cond
    }
}

#[derive(Debug, Clone, Default)]
pub struct AssetFields {
    pub name: String,
    pub category: Option<String>,
    pub location: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub warranty_end: Option<NaiveDate>,
    pub frequency_days: Option<i32>,
    pub assigned_user_id: Option<i32>,
}

/// Partial update. The outer `Option` is "touch this column"; the inner one is the new value.
#[derive(Debug, Clone, Default)]
pub struct AssetPatch {
    pub name: Option<String>,
    pub category: Option<Option<String>>,
    pub location: Option<Option<String>>,
    pub purchase_date: Option<Option<NaiveDate>>,
    pub warranty_end: Option<Option<NaiveDate>>,
    pub frequency_days: Option<Option<i32>>,
    pub assigned_user_id: Option<Option<i32>>,
}

pub struct AssetPage {
    pub items: Vec<assets::Model>,
    pub total: u64,
    pub pages: u64,
}

pub struct AssetRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> AssetRepository<'a, C> {
    #[must_use]
    pub const fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn get(&self, id: i32) -> Result<Option<assets::Model>, DbErr> {
        assets::Entity::find_by_id(id).one(self.db).await
    }

    /// `page` is 1-based.
    pub async fn list(&self, filter: &AssetFilter, page: u64, limit: u64) -> Result<AssetPage, DbErr> {
        let paginator = assets::Entity::find()
            .filter(filter.condition())
            .order_by_asc(assets::Column::Id)
            .paginate(self.db, limit);

        let counts = paginator.num_items_and_pages().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(AssetPage {
            items,
            total: counts.number_of_items,
            pages: counts.number_of_pages,
        })
    }

    pub async fn list_all(&self) -> Result<Vec<assets::Model>, DbErr> {
        assets::Entity::find()
            .order_by_asc(assets::Column::Id)
            .all(self.db)
            .await
    }

    pub async fn count(&self) -> Result<u64, DbErr> {
        assets::Entity::find().count(self.db).await
    }

    /// Assets whose warranty ends within `[from, to]`, soonest first.
    pub async fn warranty_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<assets::Model>, DbErr> {
        assets::Entity::find()
            .filter(assets::Column::WarrantyEnd.between(from, to))
            .order_by_asc(assets::Column::WarrantyEnd)
            .all(self.db)
            .await
    }

    pub async fn insert(&self, fields: AssetFields) -> Result<assets::Model, DbErr> {
        let now = chrono::Utc::now().to_rfc3339();

        assets::ActiveModel {
            name: Set(fields.name),
            category: Set(fields.category),
            location: Set(fields.location),
            purchase_date: Set(fields.purchase_date),
            warranty_end: Set(fields.warranty_end),
            frequency_days: Set(fields.frequency_days),
            assigned_user_id: Set(fields.assigned_user_id),
            qr_code_path: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.db)
        .await
    }

    pub async fn update(&self, asset: assets::Model, patch: AssetPatch) -> Result<assets::Model, DbErr> {
        let mut active: assets::ActiveModel = asset.into();

        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(category) = patch.category {
            active.category = Set(category);
        }
        if let Some(location) = patch.location {
            active.location = Set(location);
        }
        if let Some(purchase_date) = patch.purchase_date {
            active.purchase_date = Set(purchase_date);
        }
        if let Some(warranty_end) = patch.warranty_end {
            active.warranty_end = Set(warranty_end);
        }
        if let Some(frequency_days) = patch.frequency_days {
            active.frequency_days = Set(frequency_days);
        }
        if let Some(assigned_user_id) = patch.assigned_user_id {
            active.assigned_user_id = Set(assigned_user_id);
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        active.update(self.db).await
    }

    pub async fn set_qr_path(&self, id: i32, path: &str) -> Result<(), DbErr> {
        assets::ActiveModel {
            id: Set(id),
            qr_code_path: Set(Some(path.to_string())),
            ..Default::default()
        }
        .update(self.db)
        .await?;
        Ok(())
    }

    /// Deletes the asset and its maintenance logs. Returns the number of logs removed.
    pub async fn delete_cascade(&self, id: i32) -> Result<u64, DbErr> {
        let logs = maintenance_logs::Entity::delete_many()
            .filter(maintenance_logs::Column::AssetId.eq(id))
            .exec(self.db)
            .await?;

        assets::Entity::delete_by_id(id).exec(self.db).await?;

        Ok(logs.rows_affected)
    }
}
