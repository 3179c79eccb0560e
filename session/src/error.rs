use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("backend error: {0}")]
    Client(#[from] vigil_client::ClientError),

    #[error("face analysis error: {0}")]
    Face(#[from] vigil_face::FaceError),

    #[error("camera unavailable, exam cannot start: {0}")]
    CameraUnavailable(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("session has already ended")]
    AlreadyTerminal,

    #[error("{0}")]
    Other(String),
}
