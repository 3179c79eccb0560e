use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("backend request failed: {0}")]
    RequestFailed(String),

    #[error("invalid response from backend: {0}")]
    InvalidResponse(String),

    #[error("backend unreachable: {0}")]
    Unreachable(String),

    #[error("{0}")]
    Other(String),
}
