use crate::remote::RemoteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("incorrect password")]
    Auth,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("not authenticated")]
    NotAuthenticated,

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ChatError {
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth)
    }
}

impl From<RemoteError> for ChatError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Rejected(_) => Self::Auth,
            RemoteError::Transport(message) => Self::Transport(message),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
