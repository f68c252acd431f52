use sea_orm::entity::prelude::*;

use crate::domain::Role;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    /// Admin-assigned login handle; unique once set.
    #[sea_orm(unique, nullable)]
    pub username: Option<String>,

    #[sea_orm(unique)]
    pub email: String,

    /// Argon2id password hash
    pub password_hash: String,

    pub role: Role,

    pub is_active: bool,

    /// Forces password rotation on first login after provisioning or reset.
    pub must_change_password: bool,

    /// Last temporary password issued by an administrator, kept in clear text
    /// for the admin user table until the user picks their own password.
    #[sea_orm(nullable)]
    pub last_temp_password: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::assets::Entity")]
    Assets,
    #[sea_orm(has_many = "super::maintenance_logs::Entity")]
    MaintenanceLogs,
}

impl Related<super::assets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assets.def()
    }
}

impl Related<super::maintenance_logs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MaintenanceLogs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
