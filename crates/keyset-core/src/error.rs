//! Error types for keyed sets and patches.

use crate::event::EventKind;
use thiserror::Error;

/// Errors raised by keyed sets, patches and the event codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyedSetError {
    /// A decoded event carried a `type` other than add, delete or clear.
    #[error("Unknown event type: {0}")]
    InvalidEventKind(String),

    /// A decoded add/delete event was missing its key or item.
    #[error("Malformed {0} event: key and item are required")]
    MalformedEvent(EventKind),

    /// The keyer produced no key, which cannot be told apart from "not found".
    #[error("Keyer returned no key for item")]
    AmbiguousKey,

    /// A smart patch received two events of the same kind for one key.
    #[error("Invariant violation: second {kind} pending for key {key}")]
    InvariantViolation { kind: EventKind, key: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for KeyedSetError {
    fn from(err: serde_json::Error) -> Self {
        KeyedSetError::SerializationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, KeyedSetError>;
