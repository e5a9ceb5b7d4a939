//! Native event-stream connection over HTTP, backed by `eventsource-client`.
//!
//! Behaves like a browser `EventSource`: it retries transient failures on its own, with
//! backoff, including a refused first connect (reporting each one as an error while it
//! goes back to connecting). It gives up on an unexpected HTTP response, a redirect loop,
//! a malformed request or once the underlying client reports its stream closed. At that
//! point it reports [`ReadyState::Closed`] and the reconnecting client takes over.

use crate::error::{runtime_error, transport_error, Error, TransportErrorKind};
use crate::event::{ErrorEvent, MessageEvent, OpenEvent, DEFAULT_EVENT_TYPE};
use crate::state::ReadyState;
use crate::transport::{NativeEventSource, SignalSink, Transport};
use dashmap::DashSet;
use eventsource_client::{self as es, Client};
use futures_util::stream::StreamExt;
use log::*;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Transport-level options for [`HttpTransport`].
#[derive(Clone, Debug)]
pub struct HttpOptions {
    /// Extra request headers sent on every connection.
    pub headers: Vec<(String, String)>,
    /// Initial delay of the native layer's own retries.
    pub retry_delay: Duration,
    /// Upper bound for the native layer's retry delay.
    pub retry_delay_max: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            headers: Vec::new(),
            retry_delay: Duration::from_secs(1),
            retry_delay_max: Duration::from_secs(30),
        }
    }
}

impl HttpOptions {
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Opens [`HttpEventSource`] connections.
#[derive(Clone, Copy, Debug, Default)]
pub struct HttpTransport;

impl Transport for HttpTransport {
    type Options = HttpOptions;
    type Source = HttpEventSource;

    fn connect(
        &self,
        url: &str,
        options: &HttpOptions,
        signals: SignalSink,
    ) -> Result<HttpEventSource, Error> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| runtime_error(&format!("HTTP event source requires a tokio runtime: {e}")))?;

        let mut builder = es::ClientBuilder::for_url(url)
            .map_err(|e| transport_error(TransportErrorKind::InvalidUrl, &format!("{e:?}")))?;

        for (name, value) in &options.headers {
            builder = builder.header(name, value).map_err(|e| {
                transport_error(
                    TransportErrorKind::InvalidHeader,
                    &format!("{name}: {e:?}"),
                )
            })?;
        }

        let client = builder
            .reconnect(
                es::ReconnectOptions::reconnect(true)
                    .retry_initial(true)
                    .delay(options.retry_delay)
                    .backoff_factor(2)
                    .delay_max(options.retry_delay_max)
                    .build(),
            )
            .build();

        let state = Arc::new(AtomicU8::new(ReadyState::Connecting.as_u8()));
        let event_types = Arc::new(DashSet::new());

        let task = runtime.spawn(read_stream(
            client,
            url.to_string(),
            signals,
            Arc::clone(&state),
            Arc::clone(&event_types),
        ));

        Ok(HttpEventSource {
            state,
            event_types,
            task,
        })
    }
}

/// One HTTP event-stream connection, read by its own task.
pub struct HttpEventSource {
    state: Arc<AtomicU8>,
    /// Event types forwarded to the signal sink. Shared with the reader task.
    event_types: Arc<DashSet<String>>,
    task: JoinHandle<()>,
}

impl NativeEventSource for HttpEventSource {
    fn ready_state(&self) -> ReadyState {
        load_state(&self.state)
    }

    fn add_event_type(&mut self, event_type: &str) {
        self.event_types.insert(event_type.to_string());
    }

    fn remove_event_type(&mut self, event_type: &str) {
        self.event_types.remove(event_type);
    }

    fn close(&mut self) {
        self.task.abort();
        self.state
            .store(ReadyState::Closed.as_u8(), Ordering::SeqCst);
    }
}

impl Drop for HttpEventSource {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn load_state(state: &AtomicU8) -> ReadyState {
    match state.load(Ordering::SeqCst) {
        0 => ReadyState::Connecting,
        1 => ReadyState::Open,
        _ => ReadyState::Closed,
    }
}

/// Report `open` on every transition out of connecting, including after the native
/// layer's own retries.
fn mark_open(state: &AtomicU8, signals: &SignalSink, url: &str) {
    if state.swap(ReadyState::Open.as_u8(), Ordering::SeqCst) != ReadyState::Open.as_u8() {
        signals.open(OpenEvent {
            url: url.to_string(),
        });
    }
}

/// Errors the native layer will not recover from. `StreamClosed` is what the client
/// yields on every poll once it has given up, so it must end the reader. Dropped
/// connections, refused connects, timeouts and malformed lines are left to the native
/// retry loop, which backs off between attempts.
fn is_terminal(error: &es::Error) -> bool {
    matches!(
        error,
        es::Error::StreamClosed
            | es::Error::UnexpectedResponse(..)
            | es::Error::MaxRedirectLimitReached(..)
            | es::Error::MalformedLocationHeader(..)
            | es::Error::InvalidParameter(..)
    )
}

async fn read_stream(
    client: impl Client,
    url: String,
    signals: SignalSink,
    state: Arc<AtomicU8>,
    event_types: Arc<DashSet<String>>,
) {
    let mut stream = client.stream();

    loop {
        match stream.next().await {
            Some(Ok(es::SSE::Event(event))) => {
                mark_open(&state, &signals, &url);

                let event_type = if event.event_type.is_empty() {
                    DEFAULT_EVENT_TYPE.to_string()
                } else {
                    event.event_type
                };

                if !event_types.contains(&event_type) {
                    trace!("Skipping unsubscribed '{}' event from {}", event_type, url);
                    continue;
                }

                signals.event(MessageEvent {
                    event_type,
                    data: event.data,
                    last_event_id: event.id,
                });
            }
            Some(Ok(_)) => {
                // Comments (keep-alive padding) still prove the connection is up
                mark_open(&state, &signals, &url);
            }
            Some(Err(e)) => {
                let terminal = is_terminal(&e);
                let next = if terminal {
                    ReadyState::Closed
                } else {
                    ReadyState::Connecting
                };
                state.store(next.as_u8(), Ordering::SeqCst);

                debug!("Event stream error from {} (terminal: {}): {:?}", url, terminal, e);
                signals.error(ErrorEvent::new(format!("{e:?}")));

                if terminal {
                    break;
                }

                // Keep the task abortable even if the stream keeps failing without waiting.
                tokio::task::yield_now().await;
            }
            // Not produced by eventsource-client, which reports `StreamClosed` instead.
            None => {
                state.store(ReadyState::Closed.as_u8(), Ordering::SeqCst);
                debug!("Event stream from {} ended", url);
                signals.error(ErrorEvent::new("event stream ended"));
                break;
            }
        }
    }
}
