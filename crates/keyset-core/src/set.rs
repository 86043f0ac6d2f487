//! Keyed sets: deduplicated collections whose identity comes from a keyer.
//!
//! A [`KeyedSet`] maps derived keys to items, keeps insertion order, and
//! announces every committed mutation as a [`ChangeEvent`]. No event is
//! emitted for a mutation that changes nothing (adding a present key,
//! deleting an absent one), with one deliberate exception: [`KeyedSet::clear`]
//! always emits `Clear`, even on an empty set.
//!
//! Storage is reference counted and copy-on-write. Sets that share a keyer
//! object can adopt each other's storage in O(1) ([`KeyedSet::add_all`],
//! `clone`); the first mutation of either copy detaches it.

use crate::dispatch::{Dispatcher, Subscription};
use crate::entries::Entries;
use crate::error::{KeyedSetError, Result};
use crate::event::ChangeEvent;
use crate::keyer::{JsonKeyer, Keyer};
use crate::patch::Patch;
use crate::smart_patch::MarkedPatch;
use serde::Serialize;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace};

/// Key type produced by keyer `KR` for items `T`.
pub type KeyOf<T, KR> = <KR as Keyer<T>>::Key;

/// Change event type emitted by a `KeyedSet<T, KR>`.
pub type SetEvent<T, KR> = ChangeEvent<KeyOf<T, KR>, T>;

/// Options for [`KeyedSet::diff_with`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiffOptions {
    /// Never summarize "everything removed" as a single `Clear`; always
    /// list the individual deletes.
    pub no_clear: bool,
}

impl DiffOptions {
    pub fn no_clear() -> Self {
        Self { no_clear: true }
    }
}

/// An insertion-ordered set of items, deduplicated by derived key.
pub struct KeyedSet<T, KR: Keyer<T> = JsonKeyer> {
    keyer: Rc<KR>,
    entries: Rc<Entries<KR::Key, T>>,
    events: Dispatcher<KeyedSet<T, KR>, SetEvent<T, KR>>,
}

impl<T> KeyedSet<T, JsonKeyer>
where
    T: Clone + Serialize + 'static,
{
    /// An empty set keyed by canonical JSON.
    pub fn new() -> Self {
        Self::with_keyer(JsonKeyer)
    }

    /// A set keyed by canonical JSON, seeded from `items`.
    pub fn from_items<I: IntoIterator<Item = T>>(items: I) -> Result<Self> {
        let mut set = Self::new();
        set.add_all_items(items)?;
        Ok(set)
    }
}

impl<T> Default for KeyedSet<T, JsonKeyer>
where
    T: Clone + Serialize + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, KR> KeyedSet<T, KR>
where
    T: Clone + 'static,
    KR: Keyer<T> + 'static,
    KR::Key: 'static,
{
    pub fn with_keyer(keyer: KR) -> Self {
        Self::with_shared_keyer(Rc::new(keyer))
    }

    /// Build a set around a keyer object that other sets may also hold.
    /// Sets sharing one keyer object take the structural-copy fast paths.
    pub fn with_shared_keyer(keyer: Rc<KR>) -> Self {
        Self {
            keyer,
            entries: Rc::new(Entries::new()),
            events: Dispatcher::new(),
        }
    }

    pub fn keyer(&self) -> &Rc<KR> {
        &self.keyer
    }

    /// Whether both sets hold the same keyer object (not merely an equal one).
    pub fn shares_keyer(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.keyer, &other.keyer)
    }

    pub fn key_of(&self, item: &T) -> Option<KR::Key> {
        self.keyer.key(item)
    }

    fn derive_key(&self, item: &T) -> Result<KR::Key> {
        self.keyer.key(item).ok_or(KeyedSetError::AmbiguousKey)
    }

    // === Mutation ===

    /// Insert `item` unless its key is present. Returns whether it inserted.
    pub fn add(&mut self, item: T) -> Result<bool> {
        let key = self.derive_key(&item)?;
        self.add_key(key, item)
    }

    /// Insert `item` under an already-derived `key` unless the key is present.
    pub fn add_key(&mut self, key: KR::Key, item: T) -> Result<bool> {
        if self.entries.contains_key(&key) {
            return Ok(false);
        }
        let announced = self.events.has_listeners().then(|| item.clone());
        Rc::make_mut(&mut self.entries).insert(key.clone(), item);
        trace!(?key, "item added");

        if let Some(item) = announced {
            self.events.emit(&*self, &ChangeEvent::Add { key, item })?;
        }
        Ok(true)
    }

    /// Remove the member whose key matches `item`'s. Returns whether it removed.
    pub fn delete(&mut self, item: &T) -> Result<bool> {
        let key = self.derive_key(item)?;
        self.delete_key(&key)
    }

    pub fn delete_key(&mut self, key: &KR::Key) -> Result<bool> {
        if !self.entries.contains_key(key) {
            return Ok(false);
        }
        let removed = Rc::make_mut(&mut self.entries).remove(key);
        trace!(?key, "item deleted");

        if let Some(item) = removed {
            if self.events.has_listeners() {
                let event = ChangeEvent::Delete {
                    key: key.clone(),
                    item,
                };
                self.events.emit(&*self, &event)?;
            }
        }
        Ok(true)
    }

    /// Remove everything. Emits `Clear` even when the set is already empty.
    pub fn clear(&mut self) -> Result<()> {
        let dropped = self.entries.len();
        self.entries = Rc::new(Entries::new());
        debug!(dropped, "set cleared");
        self.events.emit(&*self, &ChangeEvent::Clear)
    }

    /// Bulk insert from another set.
    ///
    /// With the same keyer object, stored keys are reused: an empty set
    /// adopts the source's storage outright, a non-empty one inserts the
    /// source's entries in order. Otherwise every item is re-keyed. Listeners
    /// see one `Add` per inserted item either way. Returns the number added.
    ///
    /// On adoption every `Add` is announced even if a listener fails; the
    /// first listener error is returned afterwards. On the per-item paths a
    /// listener error stops the copy after the item it was reported for.
    pub fn add_all(&mut self, source: &Self) -> Result<usize> {
        if !self.shares_keyer(source) {
            return self.add_all_items(source.iter().cloned());
        }

        if self.entries.is_empty() {
            self.entries = Rc::clone(&source.entries);
            let adopted = self.entries.len();
            debug!(adopted, "adopted storage from set with shared keyer");

            if self.events.has_listeners() {
                let entries = Rc::clone(&self.entries);
                let mut outcome = Ok(());
                for (key, item) in entries.iter() {
                    let event = ChangeEvent::Add {
                        key: key.clone(),
                        item: item.clone(),
                    };
                    let result = self.events.emit(&*self, &event);
                    if outcome.is_ok() {
                        outcome = result;
                    }
                }
                outcome?;
            }
            return Ok(adopted);
        }

        let mut added = 0;
        for (key, item) in source.entries.iter() {
            if self.add_key(key.clone(), item.clone())? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Bulk insert from any iterable, deriving each key. Returns the number added.
    pub fn add_all_items<I: IntoIterator<Item = T>>(&mut self, items: I) -> Result<usize> {
        let mut added = 0;
        for item in items {
            if self.add(item)? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Replay one event with the same no-op rules as the direct calls.
    /// Returns whether the set changed (`Clear` always counts).
    pub fn change(&mut self, event: SetEvent<T, KR>) -> Result<bool> {
        match event {
            ChangeEvent::Add { key, item } => self.add_key(key, item),
            ChangeEvent::Delete { key, .. } => self.delete_key(&key),
            ChangeEvent::Clear => self.clear().map(|_| true),
        }
    }

    /// Replay events in order. Returns how many changed the set.
    pub fn patch<I>(&mut self, events: I) -> Result<usize>
    where
        I: IntoIterator<Item = SetEvent<T, KR>>,
    {
        let mut changed = 0;
        for event in events {
            if self.change(event)? {
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Same as [`KeyedSet::patch`].
    pub fn change_all<I>(&mut self, events: I) -> Result<usize>
    where
        I: IntoIterator<Item = SetEvent<T, KR>>,
    {
        self.patch(events)
    }

    // === Queries ===

    pub fn has(&self, item: &T) -> bool {
        self.keyer
            .key(item)
            .is_some_and(|key| self.entries.contains_key(&key))
    }

    pub fn has_key(&self, key: &KR::Key) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &KR::Key) -> Option<&T> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Items in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.entries.values()
    }

    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.iter()
    }

    /// Items again: a keyed set is a set of items, so its "keys" are its items.
    pub fn keys(&self) -> impl Iterator<Item = &T> + '_ {
        self.iter()
    }

    /// `(item, item)` pairs, as a set's entries.
    pub fn entries(&self) -> impl Iterator<Item = (&T, &T)> + '_ {
        self.iter().map(|item| (item, item))
    }

    /// `(derived key, item)` pairs in insertion order.
    pub fn key_iter(&self) -> impl Iterator<Item = (&KR::Key, &T)> + '_ {
        self.entries.iter()
    }

    pub fn for_each<F: FnMut(&T)>(&self, f: F) {
        self.iter().for_each(f)
    }

    // === Set algebra ===

    /// A new set with the items of `self` whose key is absent from `other`.
    pub fn minus(&self, other: &Self) -> Self {
        let mut result = self.clone_empty();
        let entries = Rc::make_mut(&mut result.entries);
        for (key, item) in self.entries.iter() {
            if !other.has_key(key) {
                entries.insert(key.clone(), item.clone());
            }
        }
        result
    }

    /// The patch that turns the contents of `self` into those of `newer`.
    pub fn diff(&self, newer: &Self) -> Patch<KR::Key, T> {
        self.diff_with(newer, DiffOptions::default())
    }

    /// Deletes always precede adds, so replaying the patch never holds two
    /// live entries for one key.
    pub fn diff_with(&self, newer: &Self, options: DiffOptions) -> Patch<KR::Key, T> {
        let mut patch = Patch::new();

        if newer.is_empty() && !options.no_clear {
            if !self.is_empty() {
                patch.push(ChangeEvent::Clear);
            }
            return patch;
        }

        let to_delete = self.minus(newer);
        let to_add = newer.minus(self);
        for (key, item) in to_delete.key_iter() {
            patch.push(ChangeEvent::Delete {
                key: key.clone(),
                item: item.clone(),
            });
        }
        for (key, item) in to_add.key_iter() {
            patch.push(ChangeEvent::Add {
                key: key.clone(),
                item: item.clone(),
            });
        }
        debug!(
            deletes = to_delete.len(),
            adds = to_add.len(),
            "diff computed"
        );
        patch
    }

    /// Same members, regardless of order.
    pub fn deep_equal(&self, other: &Self) -> bool {
        self.diff(other).is_empty()
    }

    // === Copies ===

    /// An empty set sharing this set's keyer. Listeners are not carried over.
    pub fn clone_empty(&self) -> Self {
        Self::with_shared_keyer(Rc::clone(&self.keyer))
    }

    // === Observation ===

    /// Attach a listener to every future committed mutation.
    ///
    /// Listeners run synchronously before the mutating call returns and are
    /// handed the set in its post-mutation state along with the event. A
    /// listener error is returned from the mutating call after all listeners
    /// have run; the mutation stays committed.
    #[must_use = "dropping the subscription detaches the listener"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: FnMut(&Self, &SetEvent<T, KR>) -> Result<()> + 'static,
    {
        self.events.subscribe(listener)
    }

    pub fn listener_count(&self) -> usize {
        self.events.listener_count()
    }

    /// Start accumulating a minimal patch of all future mutations.
    pub fn mark(&self) -> MarkedPatch<KR::Key, T> {
        MarkedPatch::observe(self)
    }
}

impl<T, KR> Clone for KeyedSet<T, KR>
where
    T: Clone + 'static,
    KR: Keyer<T> + 'static,
    KR::Key: 'static,
{
    /// Shares the keyer and, until either side mutates, the storage.
    fn clone(&self) -> Self {
        Self {
            keyer: Rc::clone(&self.keyer),
            entries: Rc::clone(&self.entries),
            events: Dispatcher::new(),
        }
    }
}

impl<T, KR> PartialEq for KeyedSet<T, KR>
where
    T: Clone + 'static,
    KR: Keyer<T> + 'static,
    KR::Key: 'static,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.key_iter().all(|(key, _)| other.has_key(key))
    }
}

impl<T: fmt::Debug, KR: Keyer<T>> fmt::Debug for KeyedSet<T, KR> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.values()).finish()
    }
}

impl<'a, T, KR> IntoIterator for &'a KeyedSet<T, KR>
where
    T: Clone + 'static,
    KR: Keyer<T> + 'static,
    KR::Key: 'static,
{
    type Item = &'a T;
    type IntoIter = Box<dyn Iterator<Item = &'a T> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
