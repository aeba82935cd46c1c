use thiserror::Error;

pub type DispatchResult<T> = Result<T, DispatchError>;

/// Error taxonomy for a dispatch run. Setup-phase failures abort the whole
/// invocation with no partial side effects; per-recipient failures are
/// aggregated into the run summary and never surface as an `Err`.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Unauthorized: no authenticated caller")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Precondition(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
