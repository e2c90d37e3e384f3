use thiserror::Error;

use brygga_core::ExecError;
use brygga_sim::BackendError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("executor error: {0}")]
    Exec(#[from] ExecError),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("invalid variable filter: {0}")]
    Pattern(#[from] regex::Error),

    #[error("not connected")]
    NotConnected,

    #[error("backend exposes no tasks")]
    NoTasks,

    #[error("unsupported variable shape: {0}")]
    UnsupportedShape(String),

    #[error("model discovery failed: {0}")]
    Discovery(String),

    #[error("parameter tuning failed: {0}")]
    Tune(String),
}
