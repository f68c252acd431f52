//! Role allow-lists and row-level ownership rules.
//!
//! Every protected route declares one [`Policy`]. The HTTP layer resolves the
//! ownership facts (who an asset is assigned to, who performed a log) and hands
//! them to [`Policy::check`]; the decision itself lives here so it can be tested
//! without a database.

use super::Role;

/// The authenticated caller, taken from a verified token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: i32,
    pub role: Role,
}

impl Actor {
    #[must_use]
    pub const fn is_tech(&self) -> bool {
        matches!(self.role, Role::Tech)
    }
}

/// Row-level rule applied to TECH actors after the role check passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// The asset named by the `asset_id` path parameter must be assigned to the actor.
    AssignedAsset,
    /// The log named by the `log_id` path parameter must have been performed by the
    /// actor, on an asset assigned to the actor.
    OwnLog,
}

impl Ownership {
    #[must_use]
    pub const fn path_param(self) -> &'static str {
        match self {
            Self::AssignedAsset => "asset_id",
            Self::OwnLog => "log_id",
        }
    }
}

/// Ownership facts loaded for the target row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OwnershipFacts {
    pub assigned_user_id: Option<i32>,
    pub technician_id: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccessDenied {
    #[error("Forbidden: Insufficient role")]
    Role,
    #[error("Forbidden: Asset not assigned to you")]
    AssetNotAssigned,
    #[error("Forbidden: Not allowed to update this log")]
    NotLogOwner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub allow: &'static [Role],
    pub ownership: Option<Ownership>,
}

impl Policy {
    pub const ANY: Self = Self::roles(&Role::ALL);
    pub const ADMIN: Self = Self::roles(&[Role::Admin]);
    pub const ADMIN_OR_MANAGER: Self = Self::roles(&[Role::Admin, Role::Manager]);
    pub const LOG_ON_ASSET: Self = Self::roles(&Role::ALL).owned(Ownership::AssignedAsset);
    pub const EDIT_OWN_LOG: Self = Self::roles(&Role::ALL).owned(Ownership::OwnLog);

    #[must_use]
    pub const fn roles(allow: &'static [Role]) -> Self {
        Self {
            allow,
            ownership: None,
        }
    }

    #[must_use]
    pub const fn owned(self, ownership: Ownership) -> Self {
        Self {
            allow: self.allow,
            ownership: Some(ownership),
        }
    }

    #[must_use]
    pub fn permits_role(&self, role: Role) -> bool {
        self.allow.contains(&role)
    }

    /// Whether [`Policy::check`] will need ownership facts for this actor.
    #[must_use]
    pub fn needs_ownership(&self, actor: &Actor) -> Option<Ownership> {
        self.ownership.filter(|_| actor.is_tech())
    }

    pub fn check_role(&self, actor: &Actor) -> Result<(), AccessDenied> {
        if self.permits_role(actor.role) {
            Ok(())
        } else {
            Err(AccessDenied::Role)
        }
    }

    /// Full decision: role allow-list, then the ownership rule for TECH actors.
    pub fn check(&self, actor: &Actor, facts: OwnershipFacts) -> Result<(), AccessDenied> {
        self.check_role(actor)?;

        match self.needs_ownership(actor) {
            None => Ok(()),
            Some(Ownership::AssignedAsset) => {
                if facts.assigned_user_id == Some(actor.id) {
                    Ok(())
                } else {
                    Err(AccessDenied::AssetNotAssigned)
                }
            }
            Some(Ownership::OwnLog) => {
                if facts.technician_id == Some(actor.id)
                    && facts.assigned_user_id == Some(actor.id)
                {
                    Ok(())
                } else {
                    Err(AccessDenied::NotLogOwner)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TECH: Actor = Actor {
        id: 7,
        role: Role::Tech,
    };
    const MANAGER: Actor = Actor {
        id: 2,
        role: Role::Manager,
    };

    fn assigned_to(id: i32) -> OwnershipFacts {
        OwnershipFacts {
            assigned_user_id: Some(id),
            technician_id: None,
        }
    }

    #[test]
    fn role_allow_list() {
        assert!(Policy::ADMIN.check_role(&MANAGER).is_err());
        assert!(Policy::ADMIN_OR_MANAGER.check_role(&MANAGER).is_ok());
        assert_eq!(
            Policy::ADMIN_OR_MANAGER.check(&TECH, OwnershipFacts::default()),
            Err(AccessDenied::Role)
        );
    }

    #[test]
    fn tech_may_log_on_assigned_asset_only() {
        assert_eq!(Policy::LOG_ON_ASSET.check(&TECH, assigned_to(7)), Ok(()));
        assert_eq!(
            Policy::LOG_ON_ASSET.check(&TECH, assigned_to(8)),
            Err(AccessDenied::AssetNotAssigned)
        );
        assert_eq!(
            Policy::LOG_ON_ASSET.check(&TECH, OwnershipFacts::default()),
            Err(AccessDenied::AssetNotAssigned)
        );
    }

    #[test]
    fn ownership_ignored_for_managers() {
        assert_eq!(Policy::LOG_ON_ASSET.check(&MANAGER, assigned_to(99)), Ok(()));
        assert_eq!(Policy::LOG_ON_ASSET.needs_ownership(&MANAGER), None);
        assert_eq!(
            Policy::LOG_ON_ASSET.needs_ownership(&TECH),
            Some(Ownership::AssignedAsset)
        );
    }

    #[test]
    fn tech_edits_only_own_log_on_own_asset() {
        let own = OwnershipFacts {
            assigned_user_id: Some(7),
            technician_id: Some(7),
        };
        assert_eq!(Policy::EDIT_OWN_LOG.check(&TECH, own), Ok(()));

        let someone_elses_log = OwnershipFacts {
            technician_id: Some(3),
            ..own
        };
        assert_eq!(
            Policy::EDIT_OWN_LOG.check(&TECH, someone_elses_log),
            Err(AccessDenied::NotLogOwner)
        );

        let reassigned_asset = OwnershipFacts {
            assigned_user_id: Some(3),
            ..own
        };
        assert_eq!(
            Policy::EDIT_OWN_LOG.check(&TECH, reassigned_asset),
            Err(AccessDenied::NotLogOwner)
        );
    }
}
