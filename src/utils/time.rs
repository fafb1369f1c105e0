use chrono::Utc;

/// Returns current timestamp in milliseconds (Unix epoch). All persisted
/// timestamps use this resolution.
pub fn current_timestamp_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Returns current timestamp in seconds
#[allow(dead_code)]
pub fn current_timestamp_seconds() -> i64 {
    Utc::now().timestamp()
}
