//! User and role models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user account in the workshop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fixed workshop roles, ordered from least to most privileged
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Mechanic,
    Admin,
    Superadmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Mechanic => "mechanic",
            Role::Admin => "admin",
            Role::Superadmin => "superadmin",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "mechanic" => Some(Role::Mechanic),
            "admin" => Some(Role::Admin),
            "superadmin" => Some(Role::Superadmin),
            _ => None,
        }
    }

    /// Capability check for inventory, purchasing, master data and user
    /// administration.
    pub fn is_admin_or_above(&self) -> bool {
        matches!(self, Role::Admin | Role::Superadmin)
    }

    pub fn is_superadmin(&self) -> bool {
        matches!(self, Role::Superadmin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Mechanic, Role::Admin, Role::Superadmin] {
            assert_eq!(Role::from_str(role.as_str()), Some(role));
        }
        assert_eq!(Role::from_str("owner"), None);
    }

    #[test]
    fn test_role_ladder() {
        assert!(!Role::Mechanic.is_admin_or_above());
        assert!(Role::Admin.is_admin_or_above());
        assert!(Role::Superadmin.is_admin_or_above());
        assert!(!Role::Admin.is_superadmin());
        assert!(Role::Mechanic < Role::Admin && Role::Admin < Role::Superadmin);
    }
}
