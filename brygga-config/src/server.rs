//! External-mode server parameters.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Transport-facing settings for the scope client connection.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct ServerConfig {
    /// TCP port the external-mode server listens on.
    #[serde(default = "default_port")]
    #[validate(range(min = 1, max = 65535))]
    pub port: u16,

    /// Keep the bridge alive after a client disconnect instead of shutting
    /// the event loop down.
    #[serde(default)]
    pub keep_alive: bool,
}

fn default_port() -> u16 {
    9999
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            keep_alive: false,
        }
    }
}
