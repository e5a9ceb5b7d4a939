/// Query parameter carrying the resumption cursor.
pub const LAST_EVENT_ID_PARAM: &str = "lastEventId";

/// Effective address for a connection attempt.
///
/// With a cursor the address gets `lastEventId=<cursor>` appended, percent-encoded,
/// joined with `?` if `base` has no query string yet and `&` otherwise.
pub fn resume_url(base: &str, last_event_id: Option<&str>) -> String {
    match last_event_id.filter(|id| !id.is_empty()) {
        None => base.to_string(),
        Some(id) => {
            let separator = if base.contains('?') { '&' } else { '?' };
            format!(
                "{base}{separator}{LAST_EVENT_ID_PARAM}={}",
                urlencoding::encode(id)
            )
        }
    }
}
