//! # Brygga Configuration System
//!
//! Hierarchical configuration for the external-mode bridge.
//!
//! ## Features
//! - **Unified Configuration**: single source of truth across all crates
//! - **Validation**: runtime validation of critical parameters
//! - **Environment Awareness**: `BRYGGA_*` variables override file values

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod backend;
mod error;
mod model;
mod server;
mod validation;

pub use backend::BackendConfig;
pub use error::ConfigError;
pub use model::ModelConfig;
pub use server::ServerConfig;

/// Top-level configuration container for the bridge.
#[derive(Debug, Serialize, Deserialize, Validate, Default)]
pub struct BryggaConfig {
    /// External-mode server settings (port, keep-alive).
    #[validate(nested)]
    pub server: ServerConfig,

    /// Target-model selection.
    #[validate(nested)]
    pub model: ModelConfig,

    /// Backend connection settings.
    #[validate(nested)]
    pub backend: BackendConfig,
}

impl BryggaConfig {
    /// Load configuration from default files and environment.
    ///
    /// Hierarchy:
    /// 1. Default values
    /// 2. `config/brygga.yaml` (skipped when missing)
    /// 3. `BRYGGA_*` environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(BryggaConfig::default()));

        if Path::new("config/brygga.yaml").exists() {
            figment = figment.merge(Yaml::file("config/brygga.yaml"));
        }

        figment
            .merge(Env::prefixed("BRYGGA_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }

    /// Load configuration from a specific path.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }

        Figment::from(Serialized::defaults(BryggaConfig::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("BRYGGA_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}
