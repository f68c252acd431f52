pub mod prelude;

pub mod assets;
pub mod audit_log;
pub mod maintenance_logs;
pub mod users;
