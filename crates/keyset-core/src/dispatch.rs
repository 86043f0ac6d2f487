//! Synchronous single-channel event dispatch.
//!
//! A [`Dispatcher`] is owned by the value that emits events. Listeners run
//! in subscription order, inside the emitting call, before it returns.
//! Each listener receives the emitting source, already in its post-event
//! state, alongside the event. A [`Subscription`] handle detaches its
//! listener on `close()` or when dropped.

use crate::error::Result;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::debug;

type Listener<S, E> = Rc<RefCell<dyn FnMut(&S, &E) -> Result<()>>>;

/// Identifier of one listener within its dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct Registry<S, E> {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener<S, E>)>,
}

impl<S, E> Registry<S, E> {
    fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        before != self.listeners.len()
    }
}

/// Emits events of type `E` from a source of type `S` to zero or more
/// listeners.
pub struct Dispatcher<S, E> {
    registry: Rc<RefCell<Registry<S, E>>>,
}

impl<S: 'static, E: 'static> Dispatcher<S, E> {
    pub fn new() -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Register a listener. It stays attached until the returned handle is
    /// closed or dropped.
    #[must_use = "dropping the subscription detaches the listener"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: FnMut(&S, &E) -> Result<()> + 'static,
    {
        let id = {
            let mut registry = self.registry.borrow_mut();
            let id = SubscriptionId(registry.next_id);
            registry.next_id += 1;
            let listener: Listener<S, E> = Rc::new(RefCell::new(listener));
            registry.listeners.push((id, listener));
            id
        };
        debug!(?id, "listener subscribed");

        let registry: Weak<RefCell<Registry<S, E>>> = Rc::downgrade(&self.registry);
        Subscription {
            id,
            detach: Some(Box::new(move || {
                if let Some(registry) = registry.upgrade() {
                    if registry.borrow_mut().remove(id) {
                        debug!(?id, "listener unsubscribed");
                    }
                }
            })),
        }
    }

    /// Deliver `event` from `source` to every listener attached when the
    /// emission starts.
    ///
    /// All listeners run even if one fails; the first error is returned.
    pub fn emit(&self, source: &S, event: &E) -> Result<()> {
        let listeners: Vec<Listener<S, E>> = self
            .registry
            .borrow()
            .listeners
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();

        let mut outcome = Ok(());
        for listener in listeners {
            let result = (&mut *listener.borrow_mut())(source, event);
            if outcome.is_ok() {
                outcome = result;
            }
        }
        outcome
    }

    pub fn listener_count(&self) -> usize {
        self.registry.borrow().listeners.len()
    }

    pub fn has_listeners(&self) -> bool {
        self.listener_count() > 0
    }
}

impl<S: 'static, E: 'static> Default for Dispatcher<S, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, E> fmt::Debug for Dispatcher<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("listeners", &self.registry.borrow().listeners.len())
            .finish()
    }
}

/// Handle for one attached listener.
pub struct Subscription {
    id: SubscriptionId,
    detach: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Detach the listener. Closing twice is a no-op.
    pub fn close(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.detach.is_none()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}
