//! Timestamp utilities.

use chrono::{DateTime, Utc};

/// Get current UTC timestamp.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// RFC 3339 rendering used for persisted timestamps.
pub fn to_rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_returns_valid_timestamp() {
        let ts = now();
        // After 2000-01-01, before 2100-01-01
        assert!(ts.timestamp() > 946_684_800);
        assert!(ts.timestamp() < 4_102_444_800);
    }

    #[test]
    fn rfc3339_parses_back() {
        let ts = now();
        let rendered = to_rfc3339(ts);
        let parsed = DateTime::parse_from_rfc3339(&rendered).unwrap();
        assert_eq!(parsed.with_timezone(&Utc), ts);
    }
}
