use thiserror::Error;

/// All errors produced by silvi-core.
#[derive(Debug, Error)]
pub enum SilviError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("wav decode error: {0}")]
    Wav(#[from] hound::Error),

    #[error("detection worker error: {0}")]
    Worker(String),

    #[error("detection worker is not running")]
    WorkerUnavailable,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SilviError {
    /// `true` for failures that belong to a single detection run rather than
    /// to the session as a whole.
    pub fn is_run_failure(&self) -> bool {
        matches!(
            self,
            SilviError::Decode(_)
                | SilviError::Wav(_)
                | SilviError::Worker(_)
                | SilviError::WorkerUnavailable
        )
    }
}

pub type Result<T> = std::result::Result<T, SilviError>;
