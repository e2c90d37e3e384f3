//! Single-threaded execution primitives for the bridge.

pub mod cancel;
pub mod event_loop;

pub use cancel::CancelSignal;
pub use event_loop::{Action, EventLoop};
