//! Infrastructure Layer
//!
//! Adapters and external integrations: the upstream WebSocket connection,
//! configuration resolution, and telemetry initialization.

pub mod config;
pub mod telemetry;
pub mod upstream;
