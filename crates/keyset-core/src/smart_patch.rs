//! Coalescing patches.
//!
//! A [`SmartPatch`] keeps the smallest set of pending events equivalent to
//! everything pushed into it:
//!
//! - an add and a delete of the same key cancel each other, whichever
//!   arrives first;
//! - a clear forgets every pending per-key event and is remembered as a
//!   single leading `Clear`.
//!
//! Pending events drain as `Clear` (if any), then deletes, then adds, each
//! group in arrival order.
//!
//! [`MarkedPatch`] is a smart patch fed by a live [`KeyedSet`] subscription,
//! returned by [`KeyedSet::mark`].

use crate::dispatch::Subscription;
use crate::entries::Entries;
use crate::error::{KeyedSetError, Result};
use crate::event::{ChangeEvent, EventKind};
use crate::keyer::Keyer;
use crate::patch::Patch;
use crate::set::KeyedSet;
use std::cell::RefCell;
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;
use tracing::{debug, trace, warn};

/// Minimal pending patch equivalent to every event pushed so far.
#[derive(Clone, Debug)]
pub struct SmartPatch<K, T> {
    cleared: bool,
    deletes: Entries<K, T>,
    adds: Entries<K, T>,
}

impl<K, T> SmartPatch<K, T>
where
    K: Clone + Eq + Hash + Debug,
    T: Clone,
{
    pub fn new() -> Self {
        Self {
            cleared: false,
            deletes: Entries::new(),
            adds: Entries::new(),
        }
    }

    /// An empty patch for events of `base`.
    pub fn for_set<KR>(_base: &KeyedSet<T, KR>) -> Self
    where
        KR: Keyer<T, Key = K>,
    {
        Self::new()
    }

    /// A patch seeded by pushing `events` in order.
    pub fn from_events<I>(events: I) -> Result<Self>
    where
        I: IntoIterator<Item = ChangeEvent<K, T>>,
    {
        let mut patch = Self::new();
        patch.push_all(events)?;
        Ok(patch)
    }

    /// Fold one event into the pending state.
    ///
    /// A second add (or delete) for a key that already has one pending is an
    /// [`KeyedSetError::InvariantViolation`]: a keyed set never emits that.
    pub fn push(&mut self, event: ChangeEvent<K, T>) -> Result<()> {
        match event {
            ChangeEvent::Clear => {
                self.cleared = true;
                self.deletes.clear();
                self.adds.clear();
                trace!("pending events reset by clear");
                Ok(())
            }
            ChangeEvent::Add { key, item } => {
                Self::fold(&mut self.deletes, &mut self.adds, EventKind::Add, key, item)
            }
            ChangeEvent::Delete { key, item } => {
                Self::fold(&mut self.adds, &mut self.deletes, EventKind::Delete, key, item)
            }
        }
    }

    fn fold(
        opposite: &mut Entries<K, T>,
        same: &mut Entries<K, T>,
        kind: EventKind,
        key: K,
        item: T,
    ) -> Result<()> {
        if opposite.remove(&key).is_some() {
            trace!(?key, %kind, "pending pair cancelled");
            return Ok(());
        }
        if same.contains_key(&key) {
            warn!(?key, %kind, "duplicate pending event");
            return Err(KeyedSetError::InvariantViolation {
                kind,
                key: format!("{:?}", key),
            });
        }
        same.insert(key, item);
        Ok(())
    }

    pub fn push_all<I>(&mut self, events: I) -> Result<()>
    where
        I: IntoIterator<Item = ChangeEvent<K, T>>,
    {
        for event in events {
            self.push(event)?;
        }
        Ok(())
    }

    /// Remove and return the next pending event.
    pub fn shift(&mut self) -> Option<ChangeEvent<K, T>> {
        if self.cleared {
            self.cleared = false;
            return Some(ChangeEvent::Clear);
        }
        if let Some((key, item)) = self.deletes.pop_first() {
            return Some(ChangeEvent::Delete { key, item });
        }
        self.adds
            .pop_first()
            .map(|(key, item)| ChangeEvent::Add { key, item })
    }

    pub fn len(&self) -> usize {
        usize::from(self.cleared) + self.deletes.len() + self.adds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_cleared(&self) -> bool {
        self.cleared
    }

    /// Pending events in drain order, without removing them.
    pub fn iter(&self) -> impl Iterator<Item = ChangeEvent<K, T>> + '_ {
        let clear = self.cleared.then_some(ChangeEvent::Clear);
        let deletes = self.deletes.iter().map(|(key, item)| ChangeEvent::Delete {
            key: key.clone(),
            item: item.clone(),
        });
        let adds = self.adds.iter().map(|(key, item)| ChangeEvent::Add {
            key: key.clone(),
            item: item.clone(),
        });
        clear.into_iter().chain(deletes).chain(adds)
    }

    /// Drain into an ordered patch.
    pub fn into_patch(mut self) -> Patch<K, T> {
        std::iter::from_fn(|| self.shift()).collect()
    }
}

impl<K, T> Default for SmartPatch<K, T>
where
    K: Clone + Eq + Hash + Debug,
    T: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// A [`SmartPatch`] attached to a keyed set's live event stream.
///
/// Every committed mutation of the source is pushed as it happens. After
/// [`MarkedPatch::close`] no further events arrive, but what is pending
/// stays available.
pub struct MarkedPatch<K, T> {
    state: Rc<RefCell<SmartPatch<K, T>>>,
    subscription: Subscription,
}

impl<K, T> MarkedPatch<K, T>
where
    K: Clone + Eq + Hash + Debug + 'static,
    T: Clone + 'static,
{
    pub(crate) fn observe<KR>(set: &KeyedSet<T, KR>) -> Self
    where
        KR: Keyer<T, Key = K> + 'static,
    {
        let state = Rc::new(RefCell::new(SmartPatch::new()));
        let sink = Rc::clone(&state);
        let subscription = set.subscribe(move |_, event| sink.borrow_mut().push(event.clone()));
        debug!(id = ?subscription.id(), "mark opened");
        Self {
            state,
            subscription,
        }
    }

    /// Fold an event in by hand, alongside the live feed.
    pub fn push(&self, event: ChangeEvent<K, T>) -> Result<()> {
        self.state.borrow_mut().push(event)
    }

    pub fn shift(&self) -> Option<ChangeEvent<K, T>> {
        self.state.borrow_mut().shift()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().is_empty()
    }

    /// Snapshot of the pending events in drain order.
    pub fn events(&self) -> Vec<ChangeEvent<K, T>> {
        self.state.borrow().iter().collect()
    }

    /// Iterate over a snapshot; later events do not show up in it.
    pub fn iter(&self) -> std::vec::IntoIter<ChangeEvent<K, T>> {
        self.events().into_iter()
    }

    /// Copy of the pending state.
    pub fn snapshot(&self) -> SmartPatch<K, T> {
        self.state.borrow().clone()
    }

    /// Move the pending state out, leaving an empty patch that keeps
    /// accumulating while the mark is open.
    pub fn take(&self) -> SmartPatch<K, T> {
        std::mem::take(&mut *self.state.borrow_mut())
    }

    /// Stop observing the source. Pending events are kept.
    pub fn close(&mut self) {
        if !self.subscription.is_closed() {
            debug!(id = ?self.subscription.id(), pending = self.len(), "mark closed");
            self.subscription.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.subscription.is_closed()
    }

    /// Close and drain everything pending into an ordered patch.
    pub fn into_patch(mut self) -> Patch<K, T> {
        self.close();
        self.take().into_patch()
    }
}

impl<K: Debug, T: Debug> Debug for MarkedPatch<K, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkedPatch")
            .field("pending", &self.state.borrow())
            .field("closed", &self.subscription.is_closed())
            .finish()
    }
}
