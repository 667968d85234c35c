//! tradelink-server: marketplace backend over HTTP and WebSocket
//!
//! Serves the supplier-consumer linking workflow, the complaint
//! escalation pipeline, staff incidents, and per-link chat with realtime
//! fan-out. Identity resolution is a bearer-token lookup; passwords and
//! token issuance belong to the surrounding auth layer.

pub mod db;
pub mod http;
pub mod models;
pub mod realtime;

pub use http::error::ApiError;
pub use http::server::{run_server, AppState, ServerConfig};
