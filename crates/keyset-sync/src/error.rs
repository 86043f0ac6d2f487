//! Error types for followers.

use keyset_core::KeyedSetError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Applying or decoding a batch failed.
    #[error(transparent)]
    Set(#[from] KeyedSetError),

    /// The follower was closed and has nothing left to apply.
    #[error("Follower is closed")]
    Closed,
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Set(err.into())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
