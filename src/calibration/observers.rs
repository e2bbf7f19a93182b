//! Typed observer registry with panic-isolated delivery.

use std::{
    cell::RefCell,
    panic::{AssertUnwindSafe, catch_unwind},
    rc::{Rc, Weak},
};

type Callback<T> = Rc<dyn Fn(&T)>;

struct Registry<T> {
    next_id: u64,
    entries: Vec<(u64, Callback<T>)>,
}

/// Callbacks notified in registration order.
pub(crate) struct ObserverRegistry<T> {
    inner: Rc<RefCell<Registry<T>>>,
}

impl<T: 'static> ObserverRegistry<T> {
    pub(crate) fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Registry {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    pub(crate) fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let id = {
            let mut registry = self.inner.borrow_mut();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.entries.push((id, Rc::new(callback)));
            id
        };
        let weak: Weak<RefCell<Registry<T>>> = Rc::downgrade(&self.inner);
        Subscription {
            dispose: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.borrow_mut().entries.retain(|(entry_id, _)| *entry_id != id);
                }
            })),
        }
    }

    /// Deliver `value` to every callback. Returns how many callbacks panicked.
    ///
    /// The callback list is copied before delivery, so callbacks may subscribe
    /// or unsubscribe without affecting the current round.
    pub(crate) fn notify(&self, value: &T) -> usize {
        let entries: Vec<(u64, Callback<T>)> = self.inner.borrow().entries.clone();
        let mut panicked = 0;
        for (id, callback) in entries {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| (*callback)(value))) {
                panicked += 1;
                tracing::warn!(
                    "Threshold subscriber {id} panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
        }
        panicked
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }
}

/// Disposer returned by `subscribe`. Dropping it removes the callback.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    dispose: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Remove the callback now.
    pub fn unsubscribe(mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }

    /// Keep the callback registered for the lifetime of the service.
    pub fn detach(mut self) {
        self.dispose = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.dispose.is_some())
            .finish()
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Unknown panic payload".to_string()
    }
}
