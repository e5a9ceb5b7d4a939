use anyhow::Result;
use eventsource::{Listener, DEFAULT_EVENT_TYPE};
use log::*;
use service::config::{Config, KEEP_ALIVE_EVENT_TYPE};
use service::logging::Logger;
use std::sync::Arc;
use tokio::sync::Notify;

mod output;

use output::Tally;

const STREAM_OPEN_EVENT_TYPE: &str = "stream-open";
const STREAM_RESET_EVENT_TYPE: &str = "stream-reset";
const STREAM_ERROR_EVENT_TYPE: &str = "stream-error";

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::new();
    Logger::init_logger(&config)?;

    info!("Starting eventstream_tail against {}", config.url());

    let source = init(&config)?;
    let tally = Tally::default();
    let fatal = Arc::new(Notify::new());

    let printer = {
        let tally = tally.clone();
        Listener::new(move |event| {
            tally.record(event);
            output::print_event(event);
        })
    };
    source.add_event_listener(DEFAULT_EVENT_TYPE, &printer);
    source.add_event_listener(STREAM_OPEN_EVENT_TYPE, &printer);
    if config.show_keep_alive {
        source.add_event_listener(KEEP_ALIVE_EVENT_TYPE, &printer);
    }

    let reset = {
        let tally = tally.clone();
        Listener::new(move |event| {
            tally.record(event);
            output::print_stream_reset();
        })
    };
    source.add_event_listener(STREAM_RESET_EVENT_TYPE, &reset);

    // The server refuses to resume after a stream error, so reconnecting would only repeat it.
    let stream_error = {
        let tally = tally.clone();
        let fatal = Arc::clone(&fatal);
        let handle = source.clone();
        Listener::new(move |event| {
            tally.record(event);
            output::print_stream_error(&event.data);
            handle.close();
            fatal.notify_one();
        })
    };
    source.add_event_listener(STREAM_ERROR_EVENT_TYPE, &stream_error);

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Interrupted, closing the stream");
        }
        _ = fatal.notified() => {
            warn!("Stream closed by the server after an error");
        }
    }

    source.close();
    // Stream errors carry the id "error", which the server will not resume from.
    let resume_from = source.last_event_id().filter(|id| id != "error");
    output::print_summary(&tally, resume_from.as_deref());

    Ok(())
}

fn init(config: &Config) -> Result<eventsource::ReconnectingEventSource<eventsource::HttpTransport>> {
    let source = service::init_event_source(config)?;
    source.set_on_open(|event| output::print_connected(&event.url));
    source.set_on_error(|event| output::print_disconnected(&event.message));
    Ok(source)
}
