use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Permission tier carried by every user and every access token.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[sea_orm(string_value = "ADMIN")]
    Admin,
    #[sea_orm(string_value = "MANAGER")]
    Manager,
    #[sea_orm(string_value = "TECH")]
    Tech,
}

impl Role {
    pub const ALL: [Self; 3] = [Self::Admin, Self::Manager, Self::Tech];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Manager => "MANAGER",
            Self::Tech => "TECH",
        }
    }

    /// Case-insensitive parse of user input. Blank input yields `None`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Some(Self::Admin),
            "MANAGER" => Some(Self::Manager),
            "TECH" => Some(Self::Tech),
            _ => None,
        }
    }

    /// Parses an optional role field, defaulting to TECH when absent or blank.
    pub fn parse_or_default(value: Option<&str>) -> Result<Self, InvalidRole> {
        match value.map(str::trim) {
            None | Some("") => Ok(Self::Tech),
            Some(v) => Self::parse(v).ok_or(InvalidRole),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid role")]
pub struct InvalidRole;

impl FromStr for Role {
    type Err = InvalidRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or(InvalidRole)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse(" Manager "), Some(Role::Manager));
        assert_eq!(Role::parse("TECH"), Some(Role::Tech));
        assert_eq!(Role::parse("owner"), None);
    }

    #[test]
    fn missing_role_defaults_to_tech() {
        assert_eq!(Role::parse_or_default(None), Ok(Role::Tech));
        assert_eq!(Role::parse_or_default(Some("  ")), Ok(Role::Tech));
        assert_eq!(Role::parse_or_default(Some("manager")), Ok(Role::Manager));
        assert_eq!(Role::parse_or_default(Some("root")), Err(InvalidRole));
    }

    #[test]
    fn serializes_as_uppercase() {
        assert_eq!(serde_json::to_string(&Role::Manager).unwrap(), "\"MANAGER\"");
        let role: Role = serde_json::from_str("\"TECH\"").unwrap();
        assert_eq!(role, Role::Tech);
    }
}
