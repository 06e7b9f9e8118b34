use chrono::{DateTime, Utc};

/// Formats a timestamp as an HTTP date, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// The current time as an HTTP date.
pub fn now() -> String {
    http_date(Utc::now())
}
