use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "assets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub category: Option<String>,
    pub location: Option<String>,
    pub purchase_date: Option<Date>,
    pub warranty_end: Option<Date>,
    /// Service interval in days; 180 when unset.
    pub frequency_days: Option<i32>,
    pub assigned_user_id: Option<i32>,
    /// Path of the generated QR image, relative to the QR directory.
    pub qr_code_path: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::AssignedUserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    AssignedUser,
    #[sea_orm(has_many = "super::maintenance_logs::Entity")]
    MaintenanceLogs,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AssignedUser.def()
    }
}

impl Related<super::maintenance_logs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MaintenanceLogs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
