//! Target-model selection.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation;

/// Which simulation model the bridge attaches to.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct ModelConfig {
    /// Model-name filter applied to the backend's variable namespace.
    /// A regular expression fragment, matched inside the
    /// `Targets/.../Simulation Models/Models/<name>/...` paths.
    #[serde(default = "default_name")]
    #[validate(custom(function = validation::validate_pattern))]
    pub name: String,
}

fn default_name() -> String {
    r"[\w|\s]*".into()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
        }
    }
}
