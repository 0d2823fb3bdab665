use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

/// Parse SQLite's `CURRENT_TIMESTAMP` text (`YYYY-MM-DD HH:MM:SS`, UTC).
pub fn parse_sqlite_timestamp(value: &str, field: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .with_context(|| format!("failed to parse {field} '{value}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_current_timestamp_format() {
        let ts = parse_sqlite_timestamp("2019-03-02 17:45:09", "timestamp").unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2019, 3, 2));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (17, 45, 9));
    }

    #[test]
    fn rejects_rfc3339() {
        assert!(parse_sqlite_timestamp("2019-03-02T17:45:09Z", "timestamp").is_err());
    }

    #[test]
    fn negative_count_is_an_error() {
        assert!(to_u64(-1, "count").is_err());
        assert_eq!(to_u64(7, "count").unwrap(), 7);
    }
}
