pub mod mindmap;
pub mod user;

use chrono::{DateTime, NaiveDateTime, Utc};

/// Current UTC time as a naive ISO-8601 timestamp with microseconds, the
/// format stored in `last_active`, `login_time` and `createdAt`.
pub fn utc_now_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Parse a stored timestamp. Accepts naive ISO-8601 (taken as UTC) and RFC 3339.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_roundtrip() {
        let now = utc_now_iso();
        let parsed = parse_timestamp(&now).unwrap();
        assert!((Utc::now() - parsed).num_seconds() < 5);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2025-01-01T00:00:00").is_some());
        assert!(parse_timestamp("2025-01-01T00:00:00.123456").is_some());
        assert!(parse_timestamp("2025-01-01T00:00:00Z").is_some());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }
}
