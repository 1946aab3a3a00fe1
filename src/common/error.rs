use thiserror::Error;

/// Failures surfaced by the chat service. Classifier problems never appear here.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Room Not Found: {0}")]
    RoomNotFound(String),
    #[error("Room already exists: {0}")]
    RoomAlreadyExists(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),
}

pub type ChatResult<T> = Result<T, ChatError>;
