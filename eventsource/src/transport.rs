//! The seam between the reconnecting client and a native, one-shot event-stream
//! connection.
//!
//! A native connection opens, delivers typed events, and eventually fails. It may
//! retry transient failures internally, but once it reports [`ReadyState::Closed`] it
//! is done and the client takes over: it discards the connection and builds a new one
//! through [`Transport::connect`] after its retry interval.

use crate::error::Error;
use crate::event::{ErrorEvent, MessageEvent, OpenEvent};
use crate::state::ReadyState;
use std::sync::{Arc, Weak};

/// A live native connection, exclusively owned by the client.
pub trait NativeEventSource: Send + 'static {
    /// `Closed` means terminal failure: the connection will not recover on its own.
    fn ready_state(&self) -> ReadyState;

    /// Start delivering events of `event_type` to the signal sink.
    fn add_event_type(&mut self, event_type: &str);

    /// Stop delivering events of `event_type`.
    fn remove_event_type(&mut self, event_type: &str);

    /// Release the connection. No signals may be delivered afterwards.
    fn close(&mut self);
}

/// Factory for native connections.
///
/// Implementations must return without blocking and must never call into the
/// [`SignalSink`] from inside `connect` or any [`NativeEventSource`] method; signals
/// are delivered later, from the transport's own task.
pub trait Transport: Send + Sync + 'static {
    /// Transport-level options, forwarded untouched on every connection attempt.
    type Options: Clone + Send + Sync + 'static;
    type Source: NativeEventSource;

    fn connect(
        &self,
        url: &str,
        options: &Self::Options,
        signals: SignalSink,
    ) -> Result<Self::Source, Error>;
}

pub(crate) trait SignalReceiver: Send + Sync {
    fn on_open(self: Arc<Self>, generation: u64, event: OpenEvent);
    fn on_error(self: Arc<Self>, generation: u64, event: ErrorEvent);
    fn on_event(self: Arc<Self>, generation: u64, event: MessageEvent);
}

/// Where a native connection reports open, error and event signals.
///
/// Every sink is bound to a single connection attempt. Once the client has replaced or
/// closed that connection, or has been dropped, signals sent through the sink are ignored.
#[derive(Clone)]
pub struct SignalSink {
    receiver: Weak<dyn SignalReceiver>,
    generation: u64,
}

impl SignalSink {
    pub(crate) fn new(receiver: Weak<dyn SignalReceiver>, generation: u64) -> Self {
        Self {
            receiver,
            generation,
        }
    }

    pub fn open(&self, event: OpenEvent) {
        if let Some(receiver) = self.receiver.upgrade() {
            receiver.on_open(self.generation, event);
        }
    }

    pub fn error(&self, event: ErrorEvent) {
        if let Some(receiver) = self.receiver.upgrade() {
            receiver.on_error(self.generation, event);
        }
    }

    pub fn event(&self, event: MessageEvent) {
        if let Some(receiver) = self.receiver.upgrade() {
            receiver.on_event(self.generation, event);
        }
    }

    /// Connection attempt this sink belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the client on the other end still exists.
    pub fn is_attached(&self) -> bool {
        self.receiver.strong_count() > 0
    }
}

/// A sink whose client is already gone.
#[cfg(test)]
pub(crate) fn detached_sink() -> SignalSink {
    struct Detached;

    impl SignalReceiver for Detached {
        fn on_open(self: Arc<Self>, _: u64, _: OpenEvent) {}
        fn on_error(self: Arc<Self>, _: u64, _: ErrorEvent) {}
        fn on_event(self: Arc<Self>, _: u64, _: MessageEvent) {}
    }

    let receiver: Weak<dyn SignalReceiver> = Weak::<Detached>::new();
    SignalSink::new(receiver, 0)
}
