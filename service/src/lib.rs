use config::Config;
use eventsource::error::{transport_error, TransportErrorKind};
use eventsource::{EventSourceConfig, HttpOptions, HttpTransport, ReconnectingEventSource};
use log::info;

pub mod config;
pub mod logging;

/// Native connection options derived from the command line.
pub fn http_options(config: &Config) -> HttpOptions {
    config.headers().into_iter().fold(
        HttpOptions {
            retry_delay: config.native_retry_delay(),
            retry_delay_max: config.native_retry_delay_max(),
            ..HttpOptions::default()
        },
        |options, (name, value)| options.header(name, value),
    )
}

/// Builds the stream client described by `config` and starts its first connection.
///
/// Must be called from within a tokio runtime.
pub fn init_event_source(
    config: &Config,
) -> Result<ReconnectingEventSource<HttpTransport>, eventsource::Error> {
    let url = config
        .stream_url()
        .map_err(|e| transport_error(TransportErrorKind::InvalidUrl, &e.to_string()))?;

    info!(
        "Event stream config: url={}, retry_time={}ms, native_retry={}ms..{}ms, resume_from={}",
        url,
        config.retry_time_ms,
        config.native_retry_ms,
        config.native_retry_max_ms,
        config.last_event_id.as_deref().unwrap_or("<live>"),
    );

    let mut stream_config =
        EventSourceConfig::new(http_options(config)).retry_time(config.retry_time());
    if let Some(id) = &config.last_event_id {
        stream_config = stream_config.last_event_id(id.as_str());
    }

    ReconnectingEventSource::new(HttpTransport, url, stream_config)
}
