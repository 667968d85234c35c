//! Repository implementations for database access
//!
//! Each repository follows these patterns:
//! - Single queries with JOIN/EXISTS for list annotations (no N+1)
//! - Conflicts handled via ON CONFLICT (no check-then-insert)
//! - Transactions for multi-row operations
//! - Conditional UPDATEs where concurrent writers must serialize

pub mod complaints;
pub mod incidents;
pub mod links;
pub mod messages;
pub mod orders;
pub mod users;

pub use complaints::{Complaint, ComplaintChanges, ComplaintFilter, ComplaintRepo, NewComplaint};
pub use incidents::{Incident, IncidentChanges, IncidentFilter, IncidentRepo, NewIncident};
pub use links::{Link, LinkFilter, LinkOverview, LinkRepo, NewLink};
pub use messages::{Message, MessageRepo};
pub use orders::{Order, OrderRepo};
pub use users::{User, UserRepo};

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },
}
