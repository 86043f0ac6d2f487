//! Change events and their wire shape.
//!
//! Every committed mutation of a keyed set is described by one
//! [`ChangeEvent`]. On the wire an event is a JSON object:
//!
//! ```text
//! { "type": "add",    "key": <key>, "item": <item> }
//! { "type": "delete", "key": <key>, "item": <item> }
//! { "type": "clear" }
//! ```

use crate::error::{KeyedSetError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// The kind of a change event, without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Add,
    Delete,
    Clear,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Add => "add",
            EventKind::Delete => "delete",
            EventKind::Clear => "clear",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One committed mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "lowercase",
    try_from = "WireEvent<K, T>",
    bound(
        serialize = "K: Serialize, T: Serialize",
        deserialize = "K: Deserialize<'de>, T: Deserialize<'de>"
    )
)]
pub enum ChangeEvent<K, T> {
    Add { key: K, item: T },
    Delete { key: K, item: T },
    Clear,
}

impl<K, T> ChangeEvent<K, T> {
    pub fn kind(&self) -> EventKind {
        match self {
            ChangeEvent::Add { .. } => EventKind::Add,
            ChangeEvent::Delete { .. } => EventKind::Delete,
            ChangeEvent::Clear => EventKind::Clear,
        }
    }

    /// The key of an add or delete event.
    pub fn key(&self) -> Option<&K> {
        match self {
            ChangeEvent::Add { key, .. } | ChangeEvent::Delete { key, .. } => Some(key),
            ChangeEvent::Clear => None,
        }
    }

    /// The item of an add or delete event.
    pub fn item(&self) -> Option<&T> {
        match self {
            ChangeEvent::Add { item, .. } | ChangeEvent::Delete { item, .. } => Some(item),
            ChangeEvent::Clear => None,
        }
    }

    /// The event that undoes this one. `Clear` cannot be undone without the
    /// cleared contents and maps to itself.
    pub fn inverse(self) -> Self {
        match self {
            ChangeEvent::Add { key, item } => ChangeEvent::Delete { key, item },
            ChangeEvent::Delete { key, item } => ChangeEvent::Add { key, item },
            ChangeEvent::Clear => ChangeEvent::Clear,
        }
    }
}

impl<K: Serialize, T: Serialize> ChangeEvent<K, T> {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl<K: DeserializeOwned, T: DeserializeOwned> ChangeEvent<K, T> {
    /// Decode one wire event, rejecting unknown kinds with
    /// [`KeyedSetError::InvalidEventKind`].
    pub fn from_json(text: &str) -> Result<Self> {
        let wire: WireEvent<K, T> = serde_json::from_str(text)?;
        Self::try_from(wire)
    }
}

/// Loosely-typed wire form, validated into a [`ChangeEvent`].
///
/// `None` means the field was absent. A present `null` is handed to the
/// payload type, so `null` items and keys survive decoding.
#[derive(Clone, Debug, Deserialize)]
#[serde(bound(deserialize = "K: Deserialize<'de>, T: Deserialize<'de>"))]
pub struct WireEvent<K, T> {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, deserialize_with = "present")]
    pub key: Option<K>,
    #[serde(default, deserialize_with = "present")]
    pub item: Option<T>,
}

fn present<'de, D, V>(deserializer: D) -> std::result::Result<Option<V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    V::deserialize(deserializer).map(Some)
}

impl<K, T> TryFrom<WireEvent<K, T>> for ChangeEvent<K, T> {
    type Error = KeyedSetError;

    fn try_from(wire: WireEvent<K, T>) -> Result<Self> {
        match wire.kind.as_str() {
            "clear" => Ok(ChangeEvent::Clear),
            "add" => match (wire.key, wire.item) {
                (Some(key), Some(item)) => Ok(ChangeEvent::Add { key, item }),
                _ => Err(KeyedSetError::MalformedEvent(EventKind::Add)),
            },
            "delete" => match (wire.key, wire.item) {
                (Some(key), Some(item)) => Ok(ChangeEvent::Delete { key, item }),
                _ => Err(KeyedSetError::MalformedEvent(EventKind::Delete)),
            },
            other => Err(KeyedSetError::InvalidEventKind(other.to_string())),
        }
    }
}
