use chrono::{DateTime, Utc};

/// Wall clock, pinned by `URL_RADAR_FIXED_TIME` (RFC 3339) for reproducible runs.
pub fn now_utc() -> DateTime<Utc> {
    if let Ok(value) = std::env::var("URL_RADAR_FIXED_TIME") {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&value) {
            return dt.with_timezone(&Utc);
        }
    }
    Utc::now()
}
