use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("event loop is no longer running")]
    LoopGone,

    #[error("timed out waiting for a posted action")]
    Timeout,

    #[error("failed to spawn event loop thread: {0}")]
    Spawn(#[from] std::io::Error),
}
