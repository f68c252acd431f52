//! Domain rules for the asset registry: roles, access policy, scheduling,
//! username resolution and temporary credentials.
//!
//! Nothing in here touches the database or HTTP.

pub mod access;
pub mod credentials;
pub mod csv;
pub mod role;
pub mod schedule;
pub mod username;

pub use access::{AccessDenied, Actor, Ownership, OwnershipFacts, Policy};
pub use role::{InvalidRole, Role};

use serde::Serialize;

/// Kind of mutation recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Login,
}

impl AuditAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Login => "LOGIN",
        }
    }
}

/// Entity names written to `audit_log.entity`.
pub mod audit_entity {
    pub const ASSET: &str = "asset";
    pub const MAINTENANCE_LOG: &str = "maintenance_log";
    pub const USER: &str = "user";
}
