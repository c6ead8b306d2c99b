//! Timestamp utilities

use chrono::{DateTime, SecondsFormat, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current time as Unix seconds (JWT `iat`/`exp`)
pub fn now_epoch_secs() -> i64 {
    Utc::now().timestamp()
}

/// Fixed-width RFC 3339 text used for stored timestamps
///
/// Microsecond precision with a `Z` suffix so stored values sort chronologically.
pub fn to_db_string(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[tokio::test]
    async fn test_now_successive_calls_advance() {
        let time1 = now();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let time2 = now();
        assert!(time2 > time1);
    }

    #[test]
    fn test_db_string_is_fixed_width_and_sortable() {
        let early = DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z").unwrap().with_timezone(&Utc);
        let late = DateTime::parse_from_rfc3339("2026-01-02T03:04:05.5Z").unwrap().with_timezone(&Utc);
        assert_eq!(to_db_string(&early), "2026-01-02T03:04:05.000000Z");
        assert!(to_db_string(&early) < to_db_string(&late));
    }

    #[test]
    fn test_epoch_secs_matches_now() {
        let secs = now_epoch_secs();
        assert!((secs - now().timestamp()).abs() <= 1);
    }
}
