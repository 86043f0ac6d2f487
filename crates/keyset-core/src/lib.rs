//! # keyset-core
//!
//! Keyed sets that report their own mutations, and the patches built from
//! those reports.
//!
//! This crate provides:
//! - [`KeyedSet`]: an insertion-ordered set deduplicated by a derived key
//! - [`Keyer`] strategies, with canonical JSON ([`JsonKeyer`]) as the default
//! - [`ChangeEvent`]: one committed add, delete or clear, with a JSON wire shape
//! - [`Patch`]: an ordered event log, as produced by [`KeyedSet::diff`]
//! - [`SmartPatch`] / [`MarkedPatch`]: coalescing accumulators that keep the
//!   minimal pending patch for a stream of events
//!
//! ## Example
//!
//! ```rust
//! use keyset_core::{ChangeEvent, KeyedSet};
//! use serde_json::json;
//!
//! let mut leader: KeyedSet<serde_json::Value> = KeyedSet::new();
//! leader.add(json!({"a": 1})).unwrap();
//!
//! let mut follower = leader.clone();
//! let mark = leader.mark();
//!
//! leader.add(json!(2)).unwrap();
//! leader.delete(&json!(2)).unwrap(); // cancels the add
//! leader.add(json!(3)).unwrap();
//! assert_eq!(mark.len(), 1);
//!
//! follower.patch(mark.into_patch()).unwrap();
//! assert!(follower.deep_equal(&leader));
//!
//! // Or compute the delta between two snapshots directly.
//! let patch = follower.diff(&leader.clone_empty());
//! assert_eq!(patch.iter().next(), Some(&ChangeEvent::Clear));
//! ```

pub mod dispatch;
mod entries;
pub mod error;
pub mod event;
pub mod keyer;
pub mod patch;
pub mod set;
pub mod smart_patch;

pub use dispatch::{Dispatcher, Subscription, SubscriptionId};
pub use error::{KeyedSetError, Result};
pub use event::{ChangeEvent, EventKind, WireEvent};
pub use keyer::{FnKeyer, IdentityKeyer, JsonKeyer, Keyer};
pub use patch::Patch;
pub use set::{DiffOptions, KeyOf, KeyedSet, SetEvent};
pub use smart_patch::{MarkedPatch, SmartPatch};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::KeyedSetError;
    pub use crate::event::ChangeEvent;
    pub use crate::keyer::{FnKeyer, JsonKeyer, Keyer};
    pub use crate::patch::Patch;
    pub use crate::set::{DiffOptions, KeyedSet};
    pub use crate::smart_patch::{MarkedPatch, SmartPatch};
}
