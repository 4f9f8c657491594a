//! Error type shared by every dictionary operation.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DictError>;

#[derive(Error, Debug)]
pub enum DictError {
    /// Insert of a key that is already present.
    #[error("Exist")]
    DuplicateKey,

    /// Remove or lookup of a key that is not present.
    #[error("NoSuchWord")]
    KeyNotFound,

    /// The target path could not be opened, read, or fully written.
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// The byte stream is not a well-formed dictionary file.
    #[error("{0}")]
    CorruptFormat(&'static str),

    /// An allocation failed, or the node arena ran out of ids.
    #[error("Not enough memory")]
    OutOfMemory,
}

impl From<std::collections::TryReserveError> for DictError {
    fn from(_: std::collections::TryReserveError) -> Self {
        DictError::OutOfMemory
    }
}
