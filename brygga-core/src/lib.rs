//! # brygga-core
//!
//! Foundation layer for the external-mode bridge: a single-threaded
//! run-to-completion action executor plus cooperative cancellation.
//!
//! ### Expectations:
//! - All bridge state is mutated from exactly one thread
//! - Actions run in post order, never concurrently
//! - Cancellation is level-triggered and observed at suspension points
//!
//! ### Key Submodules:
//! - `exec`: action queue, loop driver, cancellation signal

pub mod error;
pub mod exec;

pub use error::ExecError;
pub use exec::{CancelSignal, EventLoop};
