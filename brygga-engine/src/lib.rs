//! ## brygga-engine
//! Event-driven coordination layer of the bridge.
//!
//! One event loop thread owns every piece of bridge state. The transport's
//! inbound callback only ever enqueues an action; the dispatcher decodes and
//! routes requests, the capture coordinator arms/polls/reshapes waveform
//! captures while coalescing redundant requests, and the keep-alive
//! supervisor holds the loop open until cancellation, then runs ordered
//! teardown.

mod capture;
mod dispatch;
mod model;
mod state;
mod supervisor;
mod tuning;

pub mod bridge;
pub mod error;

#[cfg(test)]
pub(crate) mod testkit;

pub use bridge::Bridge;
pub use error::EngineError;
