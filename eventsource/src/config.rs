//! Client configuration.

use crate::event::{ErrorEvent, MessageEvent, OpenEvent};
use std::sync::Arc;
use std::time::Duration;

/// Reconnect delay used when none is configured.
pub const DEFAULT_RETRY_TIME: Duration = Duration::from_millis(3000);

pub(crate) type Hook<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Single-slot lifecycle callbacks. Each defaults to a no-op.
#[derive(Clone)]
pub(crate) struct Hooks {
    pub(crate) on_open: Hook<OpenEvent>,
    pub(crate) on_error: Hook<ErrorEvent>,
    pub(crate) on_message: Hook<MessageEvent>,
}

impl Default for Hooks {
    fn default() -> Self {
        Self {
            on_open: Arc::new(|_| {}),
            on_error: Arc::new(|_| {}),
            on_message: Arc::new(|_| {}),
        }
    }
}

/// Configuration for a [`ReconnectingEventSource`](crate::ReconnectingEventSource).
///
/// `options` is opaque to the client and handed to the transport verbatim on every
/// connection attempt. `last_event_id` is consumed by the client as the initial cursor
/// and is never part of what the transport sees.
#[derive(Clone)]
pub struct EventSourceConfig<O> {
    /// Initial resumption cursor. Empty strings are treated as no cursor.
    pub last_event_id: Option<String>,
    /// Fixed delay between a terminal native failure and the next connection attempt.
    pub retry_time: Duration,
    /// Transport-level options.
    pub options: O,
    pub(crate) hooks: Hooks,
}

impl<O: Default> Default for EventSourceConfig<O> {
    fn default() -> Self {
        Self::new(O::default())
    }
}

impl<O> EventSourceConfig<O> {
    pub fn new(options: O) -> Self {
        Self {
            last_event_id: None,
            retry_time: DEFAULT_RETRY_TIME,
            options,
            hooks: Hooks::default(),
        }
    }

    /// Seed the resumption cursor.
    #[must_use]
    pub fn last_event_id(mut self, id: impl Into<String>) -> Self {
        self.last_event_id = Some(id.into());
        self
    }

    /// Set the reconnect delay.
    #[must_use]
    pub fn retry_time(mut self, retry_time: Duration) -> Self {
        self.retry_time = retry_time;
        self
    }

    /// Called on every transition into the open state.
    #[must_use]
    pub fn on_open(mut self, hook: impl Fn(&OpenEvent) + Send + Sync + 'static) -> Self {
        self.hooks.on_open = Arc::new(hook);
        self
    }

    /// Called once per disconnect of an open stream.
    #[must_use]
    pub fn on_error(mut self, hook: impl Fn(&ErrorEvent) + Send + Sync + 'static) -> Self {
        self.hooks.on_error = Arc::new(hook);
        self
    }

    /// Called for every event of the default `message` type, after the listeners.
    #[must_use]
    pub fn on_message(mut self, hook: impl Fn(&MessageEvent) + Send + Sync + 'static) -> Self {
        self.hooks.on_message = Arc::new(hook);
        self
    }

    /// Cursor actually used to seed the client.
    pub(crate) fn initial_cursor(&self) -> Option<String> {
        self.last_event_id.clone().filter(|id| !id.is_empty())
    }
}
