use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("not connected to the simulation backend")]
    NotConnected,

    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    #[error("unknown task: {0}")]
    UnknownTask(String),

    #[error("unsupported variable shape: {0}")]
    UnsupportedShape(String),

    #[error("capture error: {0}")]
    Capture(String),
}
