//! Ordered patches: a plain log of change events.

use crate::error::Result;
use crate::event::{ChangeEvent, EventKind, WireEvent};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// An ordered sequence of change events describing one transition.
///
/// Replaying a patch applies its events front to back. [`Patch::shift`]
/// consumes the head; iterating by reference does not consume anything.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    transparent,
    bound(
        serialize = "K: Serialize, T: Serialize",
        deserialize = "K: Deserialize<'de>, T: Deserialize<'de>"
    )
)]
pub struct Patch<K, T> {
    events: VecDeque<ChangeEvent<K, T>>,
}

impl<K, T> Patch<K, T> {
    pub fn new() -> Self {
        Self {
            events: VecDeque::new(),
        }
    }

    pub fn push(&mut self, event: ChangeEvent<K, T>) {
        self.events.push_back(event);
    }

    /// Put an event back at the head, ahead of everything queued.
    pub fn push_front(&mut self, event: ChangeEvent<K, T>) {
        self.events.push_front(event);
    }

    /// Remove and return the first event.
    pub fn shift(&mut self) -> Option<ChangeEvent<K, T>> {
        self.events.pop_front()
    }

    pub fn front(&self) -> Option<&ChangeEvent<K, T>> {
        self.events.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChangeEvent<K, T>> + '_ {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of events of the given kind.
    pub fn count(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind() == kind).count()
    }
}

impl<K: Serialize, T: Serialize> Patch<K, T> {
    /// Encode as a JSON array of wire events.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl<K: DeserializeOwned, T: DeserializeOwned> Patch<K, T> {
    /// Decode a JSON array of wire events, reporting the first invalid one.
    pub fn from_json(text: &str) -> Result<Self> {
        let wire: Vec<WireEvent<K, T>> = serde_json::from_str(text)?;
        wire.into_iter().map(ChangeEvent::try_from).collect()
    }
}

impl<K, T> Default for Patch<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T> From<Vec<ChangeEvent<K, T>>> for Patch<K, T> {
    fn from(events: Vec<ChangeEvent<K, T>>) -> Self {
        Self {
            events: events.into(),
        }
    }
}

impl<K, T> FromIterator<ChangeEvent<K, T>> for Patch<K, T> {
    fn from_iter<I: IntoIterator<Item = ChangeEvent<K, T>>>(iter: I) -> Self {
        Self {
            events: iter.into_iter().collect(),
        }
    }
}

impl<K, T> Extend<ChangeEvent<K, T>> for Patch<K, T> {
    fn extend<I: IntoIterator<Item = ChangeEvent<K, T>>>(&mut self, iter: I) {
        self.events.extend(iter);
    }
}

impl<K, T> IntoIterator for Patch<K, T> {
    type Item = ChangeEvent<K, T>;
    type IntoIter = std::collections::vec_deque::IntoIter<ChangeEvent<K, T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl<'a, K, T> IntoIterator for &'a Patch<K, T> {
    type Item = &'a ChangeEvent<K, T>;
    type IntoIter = std::collections::vec_deque::Iter<'a, ChangeEvent<K, T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
