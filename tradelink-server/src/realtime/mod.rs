//! Realtime delivery: connection registry and chat event envelopes
//!
//! Persisted state lives in the message repository; this module only
//! pushes already-durable data to live subscribers.

pub mod events;
pub mod registry;

pub use events::{ClientEvent, MessagePayload, ServerEvent};
pub use registry::ChatRegistry;
