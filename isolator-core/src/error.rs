use thiserror::Error;

/// All errors produced by isolator-core.
#[derive(Debug, Error)]
pub enum IsolatorError {
    /// Invalid rate / duration / buffer shape. Fatal: raised before any frame is processed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A single VAD invocation failed. The speech gate absorbs these.
    #[error("classification error: {0}")]
    Classification(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("isolation run was cancelled")]
    Cancelled,

    #[error("engine is already processing a file")]
    AlreadyRunning,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, IsolatorError>;
