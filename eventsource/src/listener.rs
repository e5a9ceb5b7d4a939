use crate::event::MessageEvent;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Callback registered for a named event type.
///
/// Identity is the allocation behind the callback: clones of a `Listener` are the same
/// listener, two `Listener::new` calls with identical closures are not.
#[derive(Clone)]
pub struct Listener(Arc<dyn Fn(&MessageEvent) + Send + Sync>);

impl Listener {
    pub fn new(callback: impl Fn(&MessageEvent) + Send + Sync + 'static) -> Self {
        Self(Arc::new(callback))
    }

    /// Reference equality, not value equality.
    pub fn same(&self, other: &Listener) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn call(&self, event: &MessageEvent) {
        (self.0)(event)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Listener({:p})", Arc::as_ptr(&self.0))
    }
}

/// What the application wants to hear, independent of the live connection.
///
/// Maps an event type to its listeners in registration order. A type only has an entry
/// while it has at least one listener, so the key set is exactly the set of types that
/// must be attached to the active connection.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    listeners: HashMap<String, Vec<Listener>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Returns `true` when `event_type` had no entry before, which
    /// means the caller has to attach the type to the active connection.
    pub fn add(&mut self, event_type: &str, listener: &Listener) -> bool {
        match self.listeners.get_mut(event_type) {
            Some(registered) => {
                if !registered.iter().any(|l| l.same(listener)) {
                    registered.push(listener.clone());
                }
                false
            }
            None => {
                self.listeners
                    .insert(event_type.to_string(), vec![listener.clone()]);
                true
            }
        }
    }

    /// Unregister the first listener identical to `listener`. Returns `true` when the
    /// type's last listener went away and the entry was deleted, which means the caller
    /// has to detach the type from the active connection.
    pub fn remove(&mut self, event_type: &str, listener: &Listener) -> bool {
        let Some(registered) = self.listeners.get_mut(event_type) else {
            return false;
        };

        if let Some(index) = registered.iter().position(|l| l.same(listener)) {
            registered.remove(index);
        }

        if registered.is_empty() {
            self.listeners.remove(event_type);
            true
        } else {
            false
        }
    }

    /// Copy of the listeners for `event_type`, so that dispatch is unaffected by
    /// listeners registering or removing others while it runs.
    pub fn snapshot(&self, event_type: &str) -> Vec<Listener> {
        self.listeners.get(event_type).cloned().unwrap_or_default()
    }

    pub fn event_types(&self) -> impl Iterator<Item = &str> {
        self.listeners.keys().map(String::as_str)
    }

    pub fn contains(&self, event_type: &str) -> bool {
        self.listeners.contains_key(event_type)
    }

    pub fn len(&self, event_type: &str) -> usize {
        self.listeners.get(event_type).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}
