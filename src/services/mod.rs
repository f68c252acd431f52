pub mod storage;
pub use storage::{FileStorage, StorageError};

pub mod notifier;
pub use notifier::{CredentialNotice, MailTransport, NoticeKind, Notifier};

pub mod token;
pub use token::{TokenError, TokenService};

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, LoginResult, Registration, UserProfile};
pub use auth_service_impl::SeaOrmAuthService;

pub mod asset_service;
pub mod asset_service_impl;
pub use asset_service::{
    AssetDeleted, AssetError, AssetInput, AssetListing, AssetQr, AssetQuery, AssetService,
    AssetUpdate, AssetView, DueAsset,
};
pub use asset_service_impl::SeaOrmAssetService;

pub mod maintenance_service;
pub mod maintenance_service_impl;
pub use maintenance_service::{
    DueLog, LogInput, LogUpdate, LogView, MaintenanceError, MaintenanceService,
};
pub use maintenance_service_impl::SeaOrmMaintenanceService;

pub mod user_admin_service;
pub mod user_admin_service_impl;
pub use user_admin_service::{
    AdminUserView, BulkOutcome, BulkSource, PasswordReset, ProvisionRequest, ProvisionedUser,
    UserAdminError, UserAdminService,
};
pub use user_admin_service_impl::SeaOrmUserAdminService;

pub mod report_service;
pub mod report_service_impl;
pub use report_service::{CsvExport, DashboardSummary, ReportError, ReportService, WarrantyItem};
pub use report_service_impl::SeaOrmReportService;

pub mod due_summary;
pub use due_summary::{DueSummary, DueSummaryService};

pub mod scheduler;
pub use scheduler::Scheduler;
