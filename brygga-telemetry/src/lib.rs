//! ## brygga-telemetry
//! Structured logging for the bridge. All diagnostics in the workspace go
//! through `tracing`; this crate owns the subscriber setup.

pub mod logging;
