/// Event type name used by the stream for events sent without an explicit `event:` field.
pub const DEFAULT_EVENT_TYPE: &str = "message";

/// Signal delivered when a native connection reports that it is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenEvent {
    /// Effective address of the connection, including any resumption cursor.
    pub url: String,
}

/// Signal delivered when a native connection reports a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
    pub message: String,
}

impl ErrorEvent {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A typed event delivered by the stream. The payload is passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    pub event_type: String,
    pub data: String,
    /// Server-assigned event identifier, used as the resumption cursor.
    pub last_event_id: Option<String>,
}

impl MessageEvent {
    pub fn new(event_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            data: data.into(),
            last_event_id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.last_event_id = Some(id.into());
        self
    }

    /// The identifier to record as the new cursor. Empty identifiers do not count.
    pub fn cursor(&self) -> Option<&str> {
        self.last_event_id.as_deref().filter(|id| !id.is_empty())
    }
}
