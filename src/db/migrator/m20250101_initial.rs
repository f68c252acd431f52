use crate::entities::{assets, audit_log, maintenance_logs, prelude::*, users};
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

const BOOTSTRAP_ADMIN_EMAIL: &str = "admin@example.com";
const BOOTSTRAP_ADMIN_USERNAME: &str = "admin";

/// Hash the bootstrap password using Argon2id
fn hash_bootstrap_password() -> Result<String, DbErr> {
    use argon2::{
        Argon2,
        password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
    };

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(b"password", &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DbErr::Custom(format!("Failed to hash bootstrap password: {e}")))
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        // Parents first so foreign keys resolve.
        manager
            .create_table(schema.create_table_from_entity(Users).if_not_exists().to_owned())
            .await?;
        manager
            .create_table(schema.create_table_from_entity(Assets).if_not_exists().to_owned())
            .await?;
        manager
            .create_table(
                schema
                    .create_table_from_entity(MaintenanceLogs)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(schema.create_table_from_entity(AuditLog).if_not_exists().to_owned())
            .await?;

        let indexes = [
            Index::create()
                .name("idx_assets_category")
                .table(Assets)
                .col(assets::Column::Category)
                .if_not_exists()
                .to_owned(),
            Index::create()
                .name("idx_assets_location")
                .table(Assets)
                .col(assets::Column::Location)
                .if_not_exists()
                .to_owned(),
            Index::create()
                .name("idx_assets_assigned_user")
                .table(Assets)
                .col(assets::Column::AssignedUserId)
                .if_not_exists()
                .to_owned(),
            Index::create()
                .name("idx_assets_warranty_end")
                .table(Assets)
                .col(assets::Column::WarrantyEnd)
                .if_not_exists()
                .to_owned(),
            Index::create()
                .name("idx_maintenance_logs_asset")
                .table(MaintenanceLogs)
                .col(maintenance_logs::Column::AssetId)
                .if_not_exists()
                .to_owned(),
            Index::create()
                .name("idx_maintenance_logs_next_due")
                .table(MaintenanceLogs)
                .col(maintenance_logs::Column::NextServiceDue)
                .if_not_exists()
                .to_owned(),
            Index::create()
                .name("idx_audit_log_entity")
                .table(AuditLog)
                .col(audit_log::Column::Entity)
                .if_not_exists()
                .to_owned(),
        ];
        for index in indexes {
            manager.create_index(index).await?;
        }

        // Seed the bootstrap administrator; the password must be rotated on first login.
        let now = chrono::Utc::now().to_rfc3339();
        let insert = Query::insert()
            .into_table(Users)
            .columns([
                users::Column::Name,
                users::Column::Username,
                users::Column::Email,
                users::Column::PasswordHash,
                users::Column::Role,
                users::Column::IsActive,
                users::Column::MustChangePassword,
                users::Column::CreatedAt,
                users::Column::UpdatedAt,
            ])
            .values_panic([
                "Administrator".into(),
                BOOTSTRAP_ADMIN_USERNAME.into(),
                BOOTSTRAP_ADMIN_EMAIL.into(),
                hash_bootstrap_password()?.into(),
                crate::domain::Role::Admin.as_str().into(),
                true.into(),
                true.into(),
                now.clone().into(),
                now.into(),
            ])
            .to_owned();

        manager.exec_stmt(insert).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuditLog).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MaintenanceLogs).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Assets).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users).to_owned())
            .await?;

        Ok(())
    }
}
