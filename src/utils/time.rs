//! Time and timestamp utilities

use chrono::{DateTime, Local, TimeZone};

/// RFC 2822 style layout used for timestamp records
pub const TIMESTAMP_FORMAT: &str = "%a, %d %b %Y %T %z";

/// Format a timestamp record, terminator included
///
/// e.g. `timestamp:Sat, 17 Oct 2026 10:00:00 +0000\n`
pub fn format_timestamp_record<Tz>(now: &DateTime<Tz>, terminator: u8) -> Vec<u8>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut line = format!("timestamp:{}", now.format(TIMESTAMP_FORMAT)).into_bytes();
    line.push(terminator);
    line
}

/// Timestamp record for the current local time
pub fn local_timestamp_record(terminator: u8) -> Vec<u8> {
    format_timestamp_record(&Local::now(), terminator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    #[test]
    fn test_format_timestamp_record_utc() {
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 9, 5, 3).unwrap();
        let record = format_timestamp_record(&now, b'\n');
        assert_eq!(record, b"timestamp:Sat, 17 Oct 2026 09:05:03 +0000\n");
    }

    #[test]
    fn test_format_timestamp_record_offset() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2026, 1, 2, 23, 0, 0).unwrap();
        let record = format_timestamp_record(&now, b'\n');
        assert_eq!(record, b"timestamp:Fri, 02 Jan 2026 23:00:00 +0200\n");
    }

    #[test]
    fn test_local_record_is_terminated() {
        let record = local_timestamp_record(b'\n');
        assert!(record.starts_with(b"timestamp:"));
        assert_eq!(record.last(), Some(&b'\n'));
    }
}
