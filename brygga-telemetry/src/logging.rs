//! Subscriber setup with env-filter support.
//!
//! Thread names matter here: the event loop, transport and keep-alive
//! threads are all named, and interleaved logs are unreadable without them.

use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber. `RUST_LOG` overrides the `info` default.
pub fn init() {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_thread_names(true)
        .init()
}
