//! tradelink-core: domain vocabulary for the marketplace backend
//!
//! Pure types and rules shared by the HTTP and realtime layers: user
//! roles, the supplier-consumer link state machine, complaint and
//! incident lifecycles, and the access policy. No I/O lives here.

pub mod actor;
pub mod complaint;
pub mod incident;
pub mod link;
pub mod message;
pub mod policy;
pub mod roles;

pub use actor::Actor;
pub use complaint::{ComplaintLevel, ComplaintStatus};
pub use incident::IncidentStatus;
pub use link::LinkStatus;
pub use message::MessageKind;
pub use policy::{can_access_link, can_view_complaint, complaint_scope, require_role, ComplaintScope, PolicyError};
pub use roles::UserRole;
