//! Role model - the four fixed roles a credential or session can carry.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    FamilyAdmin,
    FamilyCoAdmin,
    FamilyUser,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::FamilyAdmin => "family_admin",
            Role::FamilyCoAdmin => "family_co_admin",
            Role::FamilyUser => "family_user",
        }
    }

    /// Every role except super_admin must belong to a family.
    pub fn is_family_scoped(&self) -> bool {
        !matches!(self, Role::SuperAdmin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Role::SuperAdmin),
            "family_admin" => Ok(Role::FamilyAdmin),
            "family_co_admin" => Ok(Role::FamilyCoAdmin),
            "family_user" => Ok(Role::FamilyUser),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}
