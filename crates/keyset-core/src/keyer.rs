//! Key derivation strategies.
//!
//! A [`Keyer`] maps an item to the key that decides its identity inside a
//! [`KeyedSet`](crate::set::KeyedSet). Two items with the same key are the
//! same member, whatever else differs between them.
//!
//! Sets built from one another share their keyer through an `Rc`. When two
//! sets hold the *same* keyer object, bulk copies can reuse stored keys
//! instead of re-deriving them. That identity check is only a performance
//! hint: two distinct keyers that behave identically produce the same
//! contents, just through the slower path.

use serde::Serialize;
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::marker::PhantomData;

/// Maps an item to its key.
///
/// Returning `None` means no key can be derived. Sets treat that as
/// [`KeyedSetError::AmbiguousKey`](crate::error::KeyedSetError::AmbiguousKey)
/// for mutations, since a missing key is indistinguishable from "not found".
pub trait Keyer<T> {
    type Key: Clone + Eq + Hash + Debug;

    /// Derive the key for `item`. Must be stable while the item is a member.
    fn key(&self, item: &T) -> Option<Self::Key>;
}

/// Canonical structural serialization: the key is the compact JSON text of
/// the item, with object members in sorted order.
///
/// Items go through `serde_json::Value` first so that maps with unordered
/// iteration (e.g. `HashMap`) still produce one canonical text. Items that
/// fail to serialize have no key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JsonKeyer;

impl<T: Serialize> Keyer<T> for JsonKeyer {
    type Key = String;

    fn key(&self, item: &T) -> Option<String> {
        serde_json::to_value(item).ok().map(|value| value.to_string())
    }
}

/// Adapts a closure into a [`Keyer`].
///
/// ```rust
/// use keyset_core::keyer::{FnKeyer, Keyer};
///
/// let by_len = FnKeyer::new(|s: &String| Some(s.len()));
/// assert_eq!(by_len.key(&"abc".to_string()), Some(3));
/// ```
pub struct FnKeyer<F, T, K> {
    derive: F,
    _marker: PhantomData<fn(&T) -> K>,
}

impl<F, T, K> FnKeyer<F, T, K>
where
    F: Fn(&T) -> Option<K>,
{
    pub fn new(derive: F) -> Self {
        Self {
            derive,
            _marker: PhantomData,
        }
    }
}

impl<F, T, K> Keyer<T> for FnKeyer<F, T, K>
where
    F: Fn(&T) -> Option<K>,
    K: Clone + Eq + Hash + Debug,
{
    type Key = K;

    fn key(&self, item: &T) -> Option<K> {
        (self.derive)(item)
    }
}

impl<F, T, K> Debug for FnKeyer<F, T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnKeyer").finish_non_exhaustive()
    }
}

/// Uses the item itself as its key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IdentityKeyer;

impl<T: Clone + Eq + Hash + Debug> Keyer<T> for IdentityKeyer {
    type Key = T;

    fn key(&self, item: &T) -> Option<T> {
        Some(item.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_json_keyer_compact_text() {
        assert_eq!(JsonKeyer.key(&json!({"a": 1})), Some(r#"{"a":1}"#.to_string()));
        assert_eq!(JsonKeyer.key(&json!(1)), Some("1".to_string()));
        assert_eq!(JsonKeyer.key(&json!("4")), Some(r#""4""#.to_string()));
    }

    #[test]
    fn test_json_keyer_is_canonical_for_maps() {
        let mut first = HashMap::new();
        let mut second = HashMap::new();
        for (k, v) in [("z", 1), ("a", 2), ("m", 3)] {
            first.insert(k, v);
        }
        for (k, v) in [("m", 3), ("z", 1), ("a", 2)] {
            second.insert(k, v);
        }

        assert_eq!(JsonKeyer.key(&first), JsonKeyer.key(&second));
        assert_eq!(JsonKeyer.key(&first), Some(r#"{"a":2,"m":3,"z":1}"#.to_string()));
    }

    #[test]
    fn test_json_keyer_unserializable_has_no_key() {
        // JSON object keys must be strings
        let mut map = HashMap::new();
        map.insert(vec![1u8], 1);
        assert_eq!(JsonKeyer.key(&map), None);
    }

    #[test]
    fn test_fn_keyer() {
        #[derive(Debug)]
        struct Record {
            id: Option<u32>,
        }

        let by_id = FnKeyer::new(|r: &Record| r.id);
        assert_eq!(by_id.key(&Record { id: Some(1000) }), Some(1000));
        assert_eq!(by_id.key(&Record { id: None }), None);
    }

    #[test]
    fn test_identity_keyer() {
        assert_eq!(IdentityKeyer.key(&7u8), Some(7u8));
    }
}
