use anyhow::Result;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction, DbErr,
    SqlErr, Statement, TransactionTrait,
};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::asset::{AssetFields, AssetFilter, AssetPage, AssetPatch, AssetRepository};
pub use repositories::audit::{AuditEntry, AuditRepository};
pub use repositories::maintenance::{LogPatch, LogWithAsset, MaintenanceRepository, NewLog};
pub use repositories::report::{MonthlyCost, ReportRepository};
pub use repositories::user::{NewUser, UserRepository};

/// True when a write failed on a UNIQUE constraint.
#[must_use]
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url
                .trim_start_matches("sqlite://")
                .trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    /// Opens the unit of work for one mutating operation. Dropping it without
    /// `commit` rolls back.
    pub async fn begin(&self) -> Result<DatabaseTransaction, DbErr> {
        self.conn.begin().await
    }

    #[must_use]
    pub const fn users(&self) -> UserRepository<'_, DatabaseConnection> {
        UserRepository::new(&self.conn)
    }

    #[must_use]
    pub const fn assets(&self) -> AssetRepository<'_, DatabaseConnection> {
        AssetRepository::new(&self.conn)
    }

    #[must_use]
    pub const fn maintenance(&self) -> MaintenanceRepository<'_, DatabaseConnection> {
        MaintenanceRepository::new(&self.conn)
    }

    #[must_use]
    pub const fn audit(&self) -> AuditRepository<'_, DatabaseConnection> {
        AuditRepository::new(&self.conn)
    }

    #[must_use]
    pub const fn reports(&self) -> ReportRepository<'_, DatabaseConnection> {
        ReportRepository::new(&self.conn)
    }
}
