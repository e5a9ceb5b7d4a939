// In-memory transport for driving the client deterministically.
#![allow(dead_code)]

use eventsource::error::{transport_error, TransportErrorKind};
use eventsource::{
    Error, ErrorEvent, MessageEvent, NativeEventSource, OpenEvent, ReadyState, SignalSink,
    Transport,
};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MockOptions {
    pub tag: String,
}

struct NativeState {
    ready_state: ReadyState,
    event_types: BTreeSet<String>,
    closed: bool,
}

/// Records every connection attempt and hands out controllable connections.
#[derive(Clone, Default)]
pub struct MockTransport {
    attempts: Arc<Mutex<Vec<Attempt>>>,
    pending_failures: Arc<Mutex<usize>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    pub fn attempt(&self, index: usize) -> Attempt {
        self.attempts.lock().unwrap()[index].clone()
    }

    pub fn last(&self) -> Attempt {
        self.attempts
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no connection attempt recorded")
    }

    pub fn urls(&self) -> Vec<String> {
        self.attempts
            .lock()
            .unwrap()
            .iter()
            .map(|a| a.url.clone())
            .collect()
    }

    /// Make the next `count` connect calls fail.
    pub fn fail_next(&self, count: usize) {
        *self.pending_failures.lock().unwrap() = count;
    }
}

impl Transport for MockTransport {
    type Options = MockOptions;
    type Source = MockSource;

    fn connect(
        &self,
        url: &str,
        options: &MockOptions,
        signals: SignalSink,
    ) -> Result<MockSource, Error> {
        {
            let mut failures = self.pending_failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(transport_error(
                    TransportErrorKind::Connect,
                    "connection refused",
                ));
            }
        }

        let native = Arc::new(Mutex::new(NativeState {
            ready_state: ReadyState::Connecting,
            event_types: BTreeSet::new(),
            closed: false,
        }));

        self.attempts.lock().unwrap().push(Attempt {
            url: url.to_string(),
            options: options.clone(),
            signals,
            native: Arc::clone(&native),
        });

        Ok(MockSource { native })
    }
}

pub struct MockSource {
    native: Arc<Mutex<NativeState>>,
}

impl NativeEventSource for MockSource {
    fn ready_state(&self) -> ReadyState {
        self.native.lock().unwrap().ready_state
    }

    fn add_event_type(&mut self, event_type: &str) {
        self.native
            .lock()
            .unwrap()
            .event_types
            .insert(event_type.to_string());
    }

    fn remove_event_type(&mut self, event_type: &str) {
        self.native.lock().unwrap().event_types.remove(event_type);
    }

    fn close(&mut self) {
        let mut native = self.native.lock().unwrap();
        native.ready_state = ReadyState::Closed;
        native.closed = true;
    }
}

/// Test-side view of one connection attempt. Signals are sent with no mock lock held.
#[derive(Clone)]
pub struct Attempt {
    pub url: String,
    pub options: MockOptions,
    signals: SignalSink,
    native: Arc<Mutex<NativeState>>,
}

impl Attempt {
    fn set_state(&self, state: ReadyState) {
        self.native.lock().unwrap().ready_state = state;
    }

    pub fn open(&self) {
        self.set_state(ReadyState::Open);
        self.signals.open(OpenEvent {
            url: self.url.clone(),
        });
    }

    /// Error the native layer recovers from by itself.
    pub fn transient_error(&self) {
        self.set_state(ReadyState::Connecting);
        self.signals.error(ErrorEvent::new("connection reset"));
    }

    /// Error after which the native layer gives up.
    pub fn terminal_failure(&self) {
        self.set_state(ReadyState::Closed);
        self.signals.error(ErrorEvent::new("gave up"));
    }

    /// Deliver an event the way a native connection does: only attached types get through.
    pub fn emit(&self, event: MessageEvent) {
        let attached = self
            .native
            .lock()
            .unwrap()
            .event_types
            .contains(&event.event_type);
        if attached {
            self.signals.event(event);
        }
    }

    /// Deliver an event regardless of what is attached.
    pub fn emit_unfiltered(&self, event: MessageEvent) {
        self.signals.event(event);
    }

    pub fn event_types(&self) -> Vec<String> {
        self.native
            .lock()
            .unwrap()
            .event_types
            .iter()
            .cloned()
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.native.lock().unwrap().closed
    }
}

/// Ordered log of callback invocations.
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == entry).count()
    }
}

/// Let paused tokio time run forward.
pub async fn wait_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
