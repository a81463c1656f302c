use chrono::{DateTime, Local};

/// Render an ISO-8601 timestamp as local `HH:MM`. Unparseable input gives
/// an empty string.
pub fn format_time(iso: &str) -> String {
    match DateTime::parse_from_rfc3339(iso) {
        Ok(time) => time.with_timezone(&Local).format("%H:%M").to_string(),
        Err(_) => String::new(),
    }
}

/// Decide whether `candidate` should replace `current` as the fetch cursor.
///
/// The cursor only moves forward when both sides are RFC 3339 timestamps.
/// Anything else is compared as opaque text, so the latest response wins.
pub fn advances_cursor(current: Option<&str>, candidate: &str) -> bool {
    if candidate.is_empty() {
        return false;
    }
    let Some(current) = current else {
        return true;
    };
    match (
        DateTime::parse_from_rfc3339(current),
        DateTime::parse_from_rfc3339(candidate),
    ) {
        (Ok(current), Ok(candidate)) => candidate >= current,
        _ => true,
    }
}
