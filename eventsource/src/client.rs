//! The reconnecting event-stream client.
//!
//! [`ReconnectingEventSource`] keeps one logical subscription alive over a sequence of
//! native connections. It owns at most one active connection and at most one pending
//! reconnect timer, resumes from the last received event id, and re-attaches every
//! registered event type to each new connection so listeners never notice the churn.
//!
//! All state lives behind a single mutex. Signal handlers update state under the lock
//! and release it before any hook or listener runs, so callbacks are free to call back
//! into the client (register listeners, remove themselves, close).

use crate::config::{EventSourceConfig, Hook, Hooks};
use crate::error::{runtime_error, Error};
use crate::event::{ErrorEvent, MessageEvent, OpenEvent, DEFAULT_EVENT_TYPE};
use crate::listener::{Listener, ListenerRegistry};
use crate::resume::resume_url;
use crate::state::ReadyState;
use crate::transport::{NativeEventSource, SignalReceiver, SignalSink, Transport};
use log::*;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Resilient client for a server-sent event stream.
///
/// Cloning yields another handle to the same client.
pub struct ReconnectingEventSource<T: Transport> {
    shared: Arc<Shared<T>>,
}

impl<T: Transport> Clone for ReconnectingEventSource<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

struct Shared<T: Transport> {
    transport: T,
    runtime: Handle,
    inner: Mutex<Inner<T>>,
}

struct Inner<T: Transport> {
    url: String,
    retry_time: Duration,
    last_event_id: Option<String>,
    ready_state: ReadyState,
    options: T::Options,
    connection: Option<T::Source>,
    /// Incremented on every connection attempt; signals tagged with an older value are stale.
    generation: u64,
    timer: Option<Timer>,
    next_timer_id: u64,
    registry: ListenerRegistry,
    hooks: Hooks,
}

struct Timer {
    id: u64,
    handle: JoinHandle<()>,
}

impl<T: Transport> Inner<T> {
    fn is_current(&self, generation: u64) -> bool {
        self.connection.is_some() && self.generation == generation
    }
}

impl<T: Transport> ReconnectingEventSource<T> {
    /// Create the client and start the first connection attempt right away.
    ///
    /// Must be called from within a tokio runtime; the reconnect timer is spawned on it.
    /// Errors from the transport creating the first connection are returned as-is.
    pub fn new(
        transport: T,
        url: impl Into<String>,
        config: EventSourceConfig<T::Options>,
    ) -> Result<Self, Error> {
        let runtime = Handle::try_current()
            .map_err(|e| runtime_error(&format!("event source requires a tokio runtime: {e}")))?;

        let last_event_id = config.initial_cursor();
        let shared = Arc::new(Shared {
            transport,
            runtime,
            inner: Mutex::new(Inner {
                url: url.into(),
                retry_time: config.retry_time,
                last_event_id,
                ready_state: ReadyState::Connecting,
                options: config.options,
                connection: None,
                generation: 0,
                timer: None,
                next_timer_id: 0,
                registry: ListenerRegistry::new(),
                hooks: config.hooks,
            }),
        });

        {
            let mut inner = shared.lock();
            shared.start(&mut inner)?;
        }

        Ok(Self { shared })
    }

    pub fn ready_state(&self) -> ReadyState {
        self.shared.lock().ready_state
    }

    /// Base address, without the resumption cursor.
    pub fn url(&self) -> String {
        self.shared.lock().url.clone()
    }

    /// Change the base address. Takes effect on the next connection attempt.
    pub fn set_url(&self, url: impl Into<String>) {
        self.shared.lock().url = url.into();
    }

    pub fn retry_time(&self) -> Duration {
        self.shared.lock().retry_time
    }

    /// Change the reconnect delay. Takes effect the next time a reconnect is scheduled.
    pub fn set_retry_time(&self, retry_time: Duration) {
        self.shared.lock().retry_time = retry_time;
    }

    /// Current resumption cursor.
    pub fn last_event_id(&self) -> Option<String> {
        self.shared.lock().last_event_id.clone()
    }

    pub fn set_on_open(&self, hook: impl Fn(&OpenEvent) + Send + Sync + 'static) {
        self.shared.lock().hooks.on_open = Arc::new(hook);
    }

    pub fn set_on_error(&self, hook: impl Fn(&ErrorEvent) + Send + Sync + 'static) {
        self.shared.lock().hooks.on_error = Arc::new(hook);
    }

    pub fn set_on_message(&self, hook: impl Fn(&MessageEvent) + Send + Sync + 'static) {
        self.shared.lock().hooks.on_message = Arc::new(hook);
    }

    /// Register `listener` for `event_type`. Registering the same listener twice for the
    /// same type is a no-op. Ignored once the client is closed.
    pub fn add_event_listener(&self, event_type: &str, listener: &Listener) {
        let mut inner = self.shared.lock();
        if inner.ready_state.is_closed() {
            debug!("Ignoring listener for '{event_type}' on a closed event source");
            return;
        }

        if inner.registry.add(event_type, listener) {
            if let Some(connection) = inner.connection.as_mut() {
                connection.add_event_type(event_type);
            }
        }
    }

    /// Unregister `listener` for `event_type`. Unknown listeners and types are ignored.
    pub fn remove_event_listener(&self, event_type: &str, listener: &Listener) {
        let mut inner = self.shared.lock();
        if inner.registry.remove(event_type, listener) && event_type != DEFAULT_EVENT_TYPE {
            if let Some(connection) = inner.connection.as_mut() {
                connection.remove_event_type(event_type);
            }
        }
    }

    /// Stop for good: cancel any pending reconnect, release the connection and move to
    /// `Closed`. Safe to call more than once.
    ///
    /// Registered listeners and hooks are dropped, so callbacks holding a handle to this
    /// client no longer keep it alive.
    pub fn close(&self) {
        let (registry, hooks) = {
            let mut inner = self.shared.lock();

            if let Some(timer) = inner.timer.take() {
                timer.handle.abort();
            }

            if let Some(mut connection) = inner.connection.take() {
                connection.close();
            }

            if !inner.ready_state.is_closed() {
                info!("Closed event source for {}", inner.url);
            }
            inner.ready_state = ReadyState::Closed;

            (
                std::mem::take(&mut inner.registry),
                std::mem::take(&mut inner.hooks),
            )
        };

        // Captured state may hold other handles; release it outside the lock.
        drop(registry);
        drop(hooks);
    }
}

impl<T: Transport> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_closed(&self) -> bool {
        self.lock().ready_state.is_closed()
    }

    /// Run a hook unless the client was closed since the hook was picked up.
    fn call_hook<E>(&self, hook: &Hook<E>, event: &E) {
        if !self.is_closed() {
            hook(event);
        }
    }

    /// Build a fresh native connection for the current cursor and attach every
    /// registered event type to it before anything can be delivered. Leaves
    /// `ready_state` alone.
    fn start(self: &Arc<Self>, inner: &mut Inner<T>) -> Result<(), Error> {
        let url = resume_url(&inner.url, inner.last_event_id.as_deref());
        inner.generation += 1;

        debug!(
            "Starting event stream connection attempt {} to {}",
            inner.generation, url
        );

        let receiver: Weak<Self> = Arc::downgrade(self);
        let receiver: Weak<dyn SignalReceiver> = receiver;
        let signals = SignalSink::new(receiver, inner.generation);
        let mut connection = self.transport.connect(&url, &inner.options, signals)?;

        // `message` is always attached so the on_message hook works without listeners.
        connection.add_event_type(DEFAULT_EVENT_TYPE);
        for event_type in inner.registry.event_types() {
            if event_type != DEFAULT_EVENT_TYPE {
                connection.add_event_type(event_type);
            }
        }

        inner.connection = Some(connection);
        Ok(())
    }

    fn schedule_reconnect(self: &Arc<Self>, inner: &mut Inner<T>) {
        if let Some(previous) = inner.timer.take() {
            previous.handle.abort();
        }

        inner.next_timer_id += 1;
        let id = inner.next_timer_id;
        let delay = inner.retry_time;
        let shared = Arc::downgrade(self);

        debug!("Reconnecting to {} in {:?}", inner.url, delay);

        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(shared) = shared.upgrade() {
                shared.fire_timer(id);
            }
        });

        inner.timer = Some(Timer { id, handle });
    }

    fn fire_timer(self: &Arc<Self>, id: u64) {
        let mut inner = self.lock();

        // A timer that woke up after being cancelled or replaced must not start anything.
        match &inner.timer {
            Some(timer) if timer.id == id => {}
            _ => return,
        }
        inner.timer = None;

        if inner.ready_state.is_closed() {
            return;
        }

        if let Err(e) = self.start(&mut inner) {
            error!("Failed to start event stream connection to {}: {e}", inner.url);
            self.schedule_reconnect(&mut inner);
        }
    }
}

impl<T: Transport> SignalReceiver for Shared<T> {
    fn on_open(self: Arc<Self>, generation: u64, event: OpenEvent) {
        let hook = {
            let mut inner = self.lock();
            if !inner.is_current(generation) || inner.ready_state != ReadyState::Connecting {
                return;
            }

            inner.ready_state = ReadyState::Open;
            info!("Event stream open: {}", event.url);
            Arc::clone(&inner.hooks.on_open)
        };

        self.call_hook(&hook, &event);
    }

    fn on_error(self: Arc<Self>, generation: u64, event: ErrorEvent) {
        let hook = {
            let mut inner = self.lock();
            if !inner.is_current(generation) {
                return;
            }

            let hook = if inner.ready_state == ReadyState::Open {
                inner.ready_state = ReadyState::Connecting;
                warn!("Event stream disconnected: {}", event.message);
                Some(Arc::clone(&inner.hooks.on_error))
            } else {
                None
            };

            let terminal = inner
                .connection
                .as_ref()
                .is_some_and(|connection| connection.ready_state().is_closed());

            if terminal {
                warn!(
                    "Event stream connection to {} failed permanently: {}",
                    inner.url, event.message
                );
                if let Some(mut connection) = inner.connection.take() {
                    connection.close();
                }
                self.schedule_reconnect(&mut inner);
            } else {
                debug!("Transient event stream error: {}", event.message);
            }

            hook
        };

        if let Some(hook) = hook {
            self.call_hook(&hook, &event);
        }
    }

    fn on_event(self: Arc<Self>, generation: u64, event: MessageEvent) {
        let (listeners, on_message) = {
            let mut inner = self.lock();
            if !inner.is_current(generation) {
                return;
            }

            // The cursor moves before any listener runs, so a listener that reconnects
            // resumes from this event.
            if let Some(cursor) = event.cursor() {
                inner.last_event_id = Some(cursor.to_string());
            }

            let listeners = inner.registry.snapshot(&event.event_type);
            let on_message = (event.event_type == DEFAULT_EVENT_TYPE)
                .then(|| Arc::clone(&inner.hooks.on_message));
            (listeners, on_message)
        };

        trace!(
            "Dispatching '{}' event to {} listener(s)",
            event.event_type,
            listeners.len()
        );

        for listener in &listeners {
            if self.is_closed() {
                return;
            }
            listener.call(&event);
        }

        if let Some(hook) = on_message {
            self.call_hook(&hook, &event);
        }
    }
}
