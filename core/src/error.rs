use crate::DocId;
use thiserror::Error;

/// Errors surfaced by the similarity core and its storage collaborators.
#[derive(Debug, Error)]
pub enum Error {
    #[error("document {0} not found")]
    NotFound(DocId),

    /// Raised by every corpus operation until the first `init` has completed.
    #[error("similarity index is not initialized")]
    NotInitialized,

    #[error("initialization cancelled")]
    Cancelled,

    #[error("store error: {0}")]
    Store(String),

    #[error("codec error: {0}")]
    Codec(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<sled::Error> for Error {
    fn from(err: sled::Error) -> Self {
        Error::Store(err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Codec(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
