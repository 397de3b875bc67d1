//! Single-threaded notifications with revocable subscriptions.
//!
//! Every event source in the viewer (scene layer changes, view changes, timer
//! expiry, control activity) is an [`Emitter`]. Subscribing returns a
//! [`Subscription`]; dropping or cancelling it removes the handler, so a
//! listener can never outlive the object that registered it.
//!
//! Handlers may return a value. [`Emitter::emit`] collects them, which lets
//! a fallible listener (the viewer's layer reconciliation) report errors back
//! to whoever triggered the notification.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type Handler<E, R> = Rc<RefCell<dyn FnMut(&E) -> R>>;

struct Registry<E, R> {
    next_id: u64,
    handlers: Vec<(u64, Handler<E, R>)>,
}

/// A list of handlers invoked in subscription order.
///
/// Cloning an emitter yields another handle to the same handler list.
pub struct Emitter<E, R = ()> {
    registry: Rc<RefCell<Registry<E, R>>>,
}

impl<E: 'static, R: 'static> Emitter<E, R> {
    pub fn new() -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry {
                next_id: 0,
                handlers: Vec::new(),
            })),
        }
    }

    /// Register a handler. It stays registered until the returned
    /// subscription is cancelled or dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, handler: impl FnMut(&E) -> R + 'static) -> Subscription {
        let id = {
            let mut registry = self.registry.borrow_mut();
            let id = registry.next_id;
            registry.next_id += 1;
            let handler: Handler<E, R> = Rc::new(RefCell::new(handler));
            registry.handlers.push((id, handler));
            id
        };

        let weak: Weak<RefCell<Registry<E, R>>> = Rc::downgrade(&self.registry);
        Subscription::new(move || {
            if let Some(registry) = weak.upgrade() {
                registry.borrow_mut().handlers.retain(|(h, _)| *h != id);
            }
        })
    }

    /// Invoke every handler with `event` and collect their return values.
    ///
    /// Handlers may subscribe or unsubscribe while the event is being
    /// dispatched. A handler removed mid-dispatch is not called; one added
    /// mid-dispatch only sees later events. A handler that re-enters its own
    /// emitter is skipped for the nested event.
    pub fn emit(&self, event: &E) -> Vec<R> {
        let snapshot: Vec<(u64, Handler<E, R>)> = self.registry.borrow().handlers.clone();
        let mut results = Vec::with_capacity(snapshot.len());

        for (id, handler) in snapshot {
            let still_registered = self
                .registry
                .borrow()
                .handlers
                .iter()
                .any(|(h, _)| *h == id);
            if !still_registered {
                continue;
            }
            match handler.try_borrow_mut() {
                Ok(mut f) => results.push((&mut *f)(event)),
                Err(_) => tracing::trace!(handler = id, "skipping re-entrant handler"),
            }
        }

        results
    }

    /// Number of live handlers.
    pub fn listener_count(&self) -> usize {
        self.registry.borrow().handlers.len()
    }
}

impl<E: 'static, R: 'static> Default for Emitter<E, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E, R> Clone for Emitter<E, R> {
    fn clone(&self) -> Self {
        Self {
            registry: Rc::clone(&self.registry),
        }
    }
}

impl<E, R> fmt::Debug for Emitter<E, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.registry.borrow().handlers.len())
            .finish()
    }
}

/// Handle to a registered handler. Revokes the handler when dropped.
pub struct Subscription {
    revoke: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    fn new(revoke: impl FnOnce() + 'static) -> Self {
        Self {
            revoke: Some(Box::new(revoke)),
        }
    }

    /// Unsubscribe now. Calling this more than once is harmless.
    pub fn cancel(&mut self) {
        if let Some(revoke) = self.revoke.take() {
            revoke();
        }
    }

    /// Whether the handler is still registered through this handle.
    pub fn is_active(&self) -> bool {
        self.revoke.is_some()
    }

    /// Keep the handler registered for the emitter's whole lifetime.
    pub fn detach(mut self) {
        self.revoke = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
