//! Error types for the `eventsource` crate.
//!
//! Follows the same pattern as the other crates in the workspace: a root `Error` struct
//! holding an error kind enum and an optional source for error chaining.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for the eventsource crate.
/// Reconnection never produces one of these; errors only surface when a caller asks
/// for something the transport cannot even attempt (a malformed address, a bad header).
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in eventsource.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    Transport(TransportErrorKind),
    /// No async runtime was available to drive connections and the reconnect timer.
    Runtime,
}

/// Errors raised by a transport while creating a native connection.
#[derive(Debug, PartialEq)]
pub enum TransportErrorKind {
    InvalidUrl,
    InvalidHeader,
    Connect,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::Transport(kind) => write!(f, "Transport error: {:?}", kind)?,
            ErrorKind::Runtime => write!(f, "Runtime error")?,
        }
        if let Some(source) = &self.source {
            write!(f, " ({source})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

/// Helper function to create transport errors.
pub fn transport_error(kind: TransportErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Transport(kind),
    }
}

/// Helper function to create runtime errors.
pub fn runtime_error(message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Runtime,
    }
}
