use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AssetService, AuthService, DueSummaryService, FileStorage, MaintenanceService, Notifier,
    ReportService, SeaOrmAssetService, SeaOrmAuthService, SeaOrmMaintenanceService,
    SeaOrmReportService, SeaOrmUserAdminService, TokenService, UserAdminService,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub storage: FileStorage,

    pub tokens: TokenService,

    pub notifier: Notifier,

    pub due_summary: DueSummaryService,

    pub auth_service: Arc<dyn AuthService>,

    pub asset_service: Arc<dyn AssetService>,

    pub maintenance_service: Arc<dyn MaintenanceService>,

    pub user_admin_service: Arc<dyn UserAdminService>,

    pub report_service: Arc<dyn ReportService>,
}

impl SharedState {
    /// Connects the database, applies migrations and wires every service.
    ///
    /// Must run inside a tokio runtime: the credential notice worker is spawned here.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Self::with_store(config, store).await
    }

    pub async fn with_store(config: Config, store: Store) -> anyhow::Result<Self> {
        let storage = FileStorage::new(&config.storage);
        storage.ensure_dirs().await?;

        let tokens = TokenService::new(&config.auth);
        let notifier = Notifier::with_mail_config(config.mail.clone());
        let tz_offset = config.scheduler.timezone_offset_minutes;

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            tokens.clone(),
            config.security.clone(),
            config.auth.allow_self_registration,
        )) as Arc<dyn AuthService>;

        let asset_service = Arc::new(SeaOrmAssetService::new(
            store.clone(),
            storage.clone(),
            tz_offset,
        )) as Arc<dyn AssetService>;

        let maintenance_service = Arc::new(SeaOrmMaintenanceService::new(store.clone(), tz_offset))
            as Arc<dyn MaintenanceService>;

        let user_admin_service = Arc::new(SeaOrmUserAdminService::new(
            store.clone(),
            config.security.clone(),
            notifier.clone(),
        )) as Arc<dyn UserAdminService>;

        let report_service = Arc::new(SeaOrmReportService::new(store.clone(), tz_offset))
            as Arc<dyn ReportService>;

        let due_summary = DueSummaryService::new(store.clone(), tz_offset);

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            storage,
            tokens,
            notifier,
            due_summary,
            auth_service,
            asset_service,
            maintenance_service,
            user_admin_service,
            report_service,
        })
    }
}
