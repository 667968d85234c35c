//! Access policy shared by the REST and realtime layers.
//!
//! Each rule is defined once here and re-checked at every point of
//! mutation; nothing is cached from a previous check on a related entity.

use thiserror::Error;

use crate::actor::Actor;
use crate::complaint::ComplaintLevel;
use crate::roles::UserRole;

/// Access denial, mapped to 403 at the HTTP boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("role '{role}' is not permitted to perform this action")]
    RoleNotAllowed { role: UserRole },

    #[error("{0}")]
    Denied(&'static str),
}

/// Require the actor to hold one of the allowed roles.
pub fn require_role(actor: &Actor, allowed: &[UserRole]) -> Result<(), PolicyError> {
    if allowed.contains(&actor.role) {
        Ok(())
    } else {
        Err(PolicyError::RoleNotAllowed { role: actor.role })
    }
}

/// Whether the actor may read or write a link's chat: the link's consumer,
/// or staff of the link's supplier.
pub fn can_access_link(actor: &Actor, link_supplier_id: i64, link_consumer_id: i64) -> bool {
    match actor.role {
        UserRole::Consumer => actor.consumer_id == Some(link_consumer_id),
        UserRole::Owner | UserRole::Manager | UserRole::SalesRepresentative => {
            actor.supplier_id == Some(link_supplier_id)
        }
    }
}

/// Whether the actor may view (and for staff, update) a complaint.
///
/// Sales reps act on sales-level complaints of their supplier, managers
/// on manager-level, owners on any level of their supplier; consumers may
/// view their own complaints only.
pub fn can_view_complaint(
    actor: &Actor,
    complaint_supplier_id: i64,
    complaint_consumer_id: i64,
    level: ComplaintLevel,
) -> bool {
    match actor.role {
        UserRole::Consumer => actor.consumer_id == Some(complaint_consumer_id),
        UserRole::SalesRepresentative => {
            actor.supplier_id == Some(complaint_supplier_id) && level == ComplaintLevel::Sales
        }
        UserRole::Manager => {
            actor.supplier_id == Some(complaint_supplier_id) && level == ComplaintLevel::Manager
        }
        UserRole::Owner => actor.supplier_id == Some(complaint_supplier_id),
    }
}

/// Role-scoped filter for complaint listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplaintScope {
    /// All complaints raised by this consumer.
    Consumer(i64),
    /// Complaints of this supplier at one visibility tier.
    SupplierLevel(i64, ComplaintLevel),
    /// All complaints of this supplier.
    Supplier(i64),
}

/// The listing scope for the actor, or `None` when the actor's profile is
/// incomplete (e.g. staff with no supplier).
pub fn complaint_scope(actor: &Actor) -> Option<ComplaintScope> {
    match actor.role {
        UserRole::Consumer => actor.consumer_id.map(ComplaintScope::Consumer),
        UserRole::SalesRepresentative => actor
            .supplier_id
            .map(|s| ComplaintScope::SupplierLevel(s, ComplaintLevel::Sales)),
        UserRole::Manager => actor
            .supplier_id
            .map(|s| ComplaintScope::SupplierLevel(s, ComplaintLevel::Manager)),
        UserRole::Owner => actor.supplier_id.map(ComplaintScope::Supplier),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consumer() -> Actor {
        Actor::consumer(1, 10)
    }

    fn rep() -> Actor {
        Actor::staff(2, UserRole::SalesRepresentative, 20)
    }

    fn manager() -> Actor {
        Actor::staff(3, UserRole::Manager, 20)
    }

    fn owner() -> Actor {
        Actor::staff(4, UserRole::Owner, 20)
    }

    #[test]
    fn require_role_rejects_outsiders() {
        assert!(require_role(&owner(), &[UserRole::Manager, UserRole::Owner]).is_ok());
        let err = require_role(&consumer(), &[UserRole::Manager, UserRole::Owner]).unwrap_err();
        assert_eq!(err, PolicyError::RoleNotAllowed { role: UserRole::Consumer });
    }

    #[test]
    fn link_access_by_membership() {
        // Consumer 10 and supplier 20 own the link.
        assert!(can_access_link(&consumer(), 20, 10));
        assert!(!can_access_link(&consumer(), 20, 11));
        assert!(can_access_link(&rep(), 20, 10));
        assert!(can_access_link(&owner(), 20, 10));
        assert!(!can_access_link(&rep(), 21, 10));
    }

    #[test]
    fn complaint_visibility_matrix() {
        // Supplier 20, consumer 10.
        assert!(can_view_complaint(&rep(), 20, 10, ComplaintLevel::Sales));
        assert!(!can_view_complaint(&rep(), 20, 10, ComplaintLevel::Manager));
        assert!(can_view_complaint(&manager(), 20, 10, ComplaintLevel::Manager));
        assert!(!can_view_complaint(&manager(), 20, 10, ComplaintLevel::Sales));
        assert!(can_view_complaint(&owner(), 20, 10, ComplaintLevel::Sales));
        assert!(can_view_complaint(&owner(), 20, 10, ComplaintLevel::Manager));
        assert!(can_view_complaint(&consumer(), 20, 10, ComplaintLevel::Manager));
        assert!(!can_view_complaint(&consumer(), 20, 11, ComplaintLevel::Sales));
        // Wrong supplier.
        assert!(!can_view_complaint(&owner(), 21, 10, ComplaintLevel::Sales));
    }

    #[test]
    fn scopes_follow_role() {
        assert_eq!(complaint_scope(&consumer()), Some(ComplaintScope::Consumer(10)));
        assert_eq!(
            complaint_scope(&rep()),
            Some(ComplaintScope::SupplierLevel(20, ComplaintLevel::Sales))
        );
        assert_eq!(
            complaint_scope(&manager()),
            Some(ComplaintScope::SupplierLevel(20, ComplaintLevel::Manager))
        );
        assert_eq!(complaint_scope(&owner()), Some(ComplaintScope::Supplier(20)));

        let orphan = Actor {
            id: 9,
            role: UserRole::Manager,
            supplier_id: None,
            consumer_id: None,
        };
        assert_eq!(complaint_scope(&orphan), None);
    }
}
