//! Authenticated actor identity

use serde::{Deserialize, Serialize};

use crate::roles::UserRole;

/// Identity record produced by the auth layer for each request.
///
/// `supplier_id` is set for supplier staff, `consumer_id` for consumers.
/// All access decisions take an `Actor`, never raw request fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: i64,
    pub role: UserRole,
    pub supplier_id: Option<i64>,
    pub consumer_id: Option<i64>,
}

impl Actor {
    pub fn consumer(id: i64, consumer_id: i64) -> Self {
        Self {
            id,
            role: UserRole::Consumer,
            supplier_id: None,
            consumer_id: Some(consumer_id),
        }
    }

    pub fn staff(id: i64, role: UserRole, supplier_id: i64) -> Self {
        Self {
            id,
            role,
            supplier_id: Some(supplier_id),
            consumer_id: None,
        }
    }
}
