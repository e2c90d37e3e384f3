//! Errors surfaced while loading the bridge configuration.

use std::path::PathBuf;

use thiserror::Error;
use validator::ValidationErrors;

/// Failure to load or validate the bridge configuration.
///
/// Covers the three ways loading can go wrong: an explicitly named file
/// that does not exist, a layered source figment cannot parse, and a
/// parsed config that fails validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("invalid configuration: {}", list_failures(.0))]
    Validation(#[source] ValidationErrors),

    #[error("configuration parsing failed: {0}")]
    Parsing(#[from] figment::Error),
}

impl From<ValidationErrors> for ConfigError {
    fn from(errors: ValidationErrors) -> Self {
        ConfigError::Validation(errors)
    }
}

/// Renders `field: reason` pairs on a single line, so the failure fits one
/// log record.
fn list_failures(errors: &ValidationErrors) -> String {
    let mut parts = Vec::new();
    for (field, errors) in errors.field_errors() {
        for error in errors {
            let reason = error
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| error.code.to_string());
            parts.push(format!("{field}: {reason}"));
        }
    }
    parts.join("; ")
}
