pub use super::assets::Entity as Assets;
pub use super::audit_log::Entity as AuditLog;
pub use super::maintenance_logs::Entity as MaintenanceLogs;
pub use super::users::Entity as Users;
