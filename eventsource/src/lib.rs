//! Resilient client for server-sent event (SSE) streams.
//!
//! A [`ReconnectingEventSource`] keeps one logical, long-lived subscription open over
//! native connections that may drop at any time. Application code registers listeners
//! once and never sees the reconnect churn underneath.
//!
//! # Architecture
//!
//! - **Native transport seam**: a [`Transport`] creates one-shot native connections
//!   ([`NativeEventSource`]). A native connection may retry transient failures on its
//!   own; once it reports [`ReadyState::Closed`] the client discards it and builds a new
//!   one after a fixed retry interval.
//! - **Resumption cursor**: the id of the last received event is sent back on every new
//!   connection as a `lastEventId` query parameter so the server can replay what was
//!   missed.
//! - **Listener registry**: listeners are kept per event type, in registration order,
//!   deduplicated by identity, and re-attached to every new connection.
//! - **Hooks**: single-slot `on_open`, `on_error` and `on_message` callbacks observe
//!   the client's own state changes, at most once per transition.
//!
//! # State machine
//!
//! ```text
//! Connecting --(native open)--> Open --(native error)--> Connecting
//!      \                          |
//!       `------(close())----------+------> Closed   (terminal)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use eventsource::{EventSourceConfig, HttpOptions, HttpTransport, Listener, ReconnectingEventSource};
//!
//! let source = ReconnectingEventSource::new(
//!     HttpTransport,
//!     "https://example.com/events/?channel=room-1",
//!     EventSourceConfig::new(HttpOptions::default()).on_open(|_| println!("connected")),
//! )?;
//!
//! source.add_event_listener("message", &Listener::new(|event| println!("{}", event.data)));
//! ```
//!
//! # Modules
//!
//! - `client`: the reconnecting client and its state machine
//! - `listener`: the listener registry and identity-compared listener handles
//! - `transport`: the native connection traits and the signal sink
//! - `http`: the HTTP native transport built on `eventsource-client`
//! - `resume`: effective address computation for the resumption cursor

pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod http;
pub mod listener;
pub mod resume;
pub mod state;
pub mod transport;

pub use client::ReconnectingEventSource;
pub use config::{EventSourceConfig, DEFAULT_RETRY_TIME};
pub use error::{Error, ErrorKind};
pub use event::{ErrorEvent, MessageEvent, OpenEvent, DEFAULT_EVENT_TYPE};
pub use http::{HttpEventSource, HttpOptions, HttpTransport};
pub use listener::{Listener, ListenerRegistry};
pub use state::ReadyState;
pub use transport::{NativeEventSource, SignalSink, Transport};
