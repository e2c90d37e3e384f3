//! Backend-facing settings.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Settings for the simulation backend connection.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct BackendConfig {
    /// Seed for the built-in simulated bench.
    #[serde(default)]
    pub seed: u64,

    /// Deadline for synchronous facade calls (connect, start/stop
    /// simulation). The caller fails fast on expiry; the posted action still
    /// runs whenever the loop gets to it.
    #[serde(default = "default_sync_call_timeout_secs")]
    #[validate(range(min = 1, max = 600))]
    pub sync_call_timeout_secs: u64,
}

fn default_sync_call_timeout_secs() -> u64 {
    30
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            sync_call_timeout_secs: default_sync_call_timeout_secs(),
        }
    }
}
