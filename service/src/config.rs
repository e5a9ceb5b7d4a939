use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::{warn, LevelFilter};
use std::time::Duration;
use url::Url;

/// Query parameter used by the server to select the channels to stream.
const CHANNEL_PARAM: &str = "channel";

/// Event type the server sends periodically to keep idle connections alive.
pub const KEEP_ALIVE_EVENT_TYPE: &str = "keep-alive";

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Address of the event stream endpoint (e.g., http://localhost:8000/events/)
    #[arg(short, long, env = "EVENTSTREAM_URL")]
    url: String,

    /// Channels to subscribe to. Each one is sent as a `channel` query parameter.
    #[arg(
        short,
        long = "channel",
        env = "EVENTSTREAM_CHANNELS",
        value_delimiter = ','
    )]
    pub channels: Vec<String>,

    /// Resume the stream after this event id instead of starting from the live edge.
    #[arg(long, env = "EVENTSTREAM_LAST_EVENT_ID")]
    pub last_event_id: Option<String>,

    /// Milliseconds to wait before reconnecting once a connection has failed for good
    #[arg(long, env = "EVENTSTREAM_RETRY_TIME_MS", default_value_t = 3000)]
    pub retry_time_ms: u64,

    /// Extra request headers in `Name: value` form.
    #[arg(long = "header", env = "EVENTSTREAM_HEADER")]
    headers: Vec<String>,

    /// Initial delay in milliseconds of the connection's own retries after a transient error
    #[arg(long, env = "EVENTSTREAM_NATIVE_RETRY_MS", default_value_t = 1000)]
    pub native_retry_ms: u64,

    /// Upper bound in milliseconds for the connection's own retry delay
    #[arg(long, env = "EVENTSTREAM_NATIVE_RETRY_MAX_MS", default_value_t = 30000)]
    pub native_retry_max_ms: u64,

    /// Also print the server's keep-alive events
    #[arg(long, env = "EVENTSTREAM_SHOW_KEEP_ALIVE")]
    pub show_keep_alive: bool,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    /// The configured base address, as given.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Address to stream from: the base address plus one `channel` parameter per channel.
    pub fn stream_url(&self) -> Result<String, url::ParseError> {
        let mut url = Url::parse(&self.url)?;

        if !self.channels.is_empty() {
            let mut query = url.query_pairs_mut();
            for channel in &self.channels {
                query.append_pair(CHANNEL_PARAM, channel);
            }
        }

        Ok(url.to_string())
    }

    /// Request headers parsed from `Name: value` pairs. Malformed entries are skipped.
    pub fn headers(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .filter_map(|raw| {
                let parsed = parse_header(raw);
                if parsed.is_none() {
                    warn!("Ignoring malformed header '{raw}', expected 'Name: value'");
                }
                parsed
            })
            .collect()
    }

    pub fn retry_time(&self) -> Duration {
        Duration::from_millis(self.retry_time_ms)
    }

    pub fn native_retry_delay(&self) -> Duration {
        Duration::from_millis(self.native_retry_ms)
    }

    pub fn native_retry_delay_max(&self) -> Duration {
        Duration::from_millis(self.native_retry_max_ms)
    }
}

fn parse_header(raw: &str) -> Option<(String, String)> {
    let (name, value) = raw.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}
