//! User roles

use serde::{Deserialize, Serialize};

/// Role of an authenticated user.
///
/// Consumers belong to a consumer organization; the other three roles are
/// supplier staff and carry a `supplier_id` on their user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum UserRole {
    Consumer,
    Owner,
    Manager,
    SalesRepresentative,
}

impl UserRole {
    /// Stable string form, matching the database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Consumer => "consumer",
            Self::Owner => "owner",
            Self::Manager => "manager",
            Self::SalesRepresentative => "sales_representative",
        }
    }

    /// Whether this role is supplier-side staff (owner, manager, sales rep).
    pub fn is_supplier_staff(&self) -> bool {
        matches!(self, Self::Owner | Self::Manager | Self::SalesRepresentative)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_predicate() {
        assert!(!UserRole::Consumer.is_supplier_staff());
        assert!(UserRole::Owner.is_supplier_staff());
        assert!(UserRole::Manager.is_supplier_staff());
        assert!(UserRole::SalesRepresentative.is_supplier_staff());
    }

    #[test]
    fn serde_round_trip_snake_case() {
        let json = serde_json::to_string(&UserRole::SalesRepresentative).unwrap();
        assert_eq!(json, "\"sales_representative\"");
        let role: UserRole = serde_json::from_str("\"consumer\"").unwrap();
        assert_eq!(role, UserRole::Consumer);
    }
}
