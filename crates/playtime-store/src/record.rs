//! Usage log line format
//!
//! One record per line, comma separated:
//!
//! ```text
//! <ISO-8601 timestamp>,<ISO-8601 date>,<duration-in-seconds>
//! ```

use chrono::{DateTime, Local, NaiveDate, SecondsFormat};
use std::time::Duration;

/// Field separator within a record line
pub const FIELD_DELIMITER: char = ',';

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One persisted flush of the daily total
#[derive(Debug, Clone, PartialEq)]
pub struct UsageRecord {
    /// Wall-clock instant of the flush. Kept verbatim, never interpreted.
    pub timestamp: String,

    /// Calendar date the total belongs to
    pub date: NaiveDate,

    /// Accumulated time for `date` as of the flush
    pub duration: Duration,
}

impl UsageRecord {
    pub fn new(flushed_at: DateTime<Local>, date: NaiveDate, duration: Duration) -> Self {
        Self {
            timestamp: flushed_at.to_rfc3339_opts(SecondsFormat::Millis, false),
            date,
            duration,
        }
    }

    /// Render the record as a newline-terminated log line
    pub fn to_line(&self) -> String {
        format!(
            "{}{d}{}{d}{}\n",
            self.timestamp,
            self.date.format(DATE_FORMAT),
            format_seconds(self.duration),
            d = FIELD_DELIMITER,
        )
    }

    /// Parse a single log line (trailing newline optional)
    pub fn parse_line(line: &str) -> Result<Self, String> {
        let line = line.trim_end_matches(['\n', '\r']);
        let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
        if fields.len() != 3 {
            return Err(format!("expected 3 fields, found {}", fields.len()));
        }

        let date = NaiveDate::parse_from_str(fields[1].trim(), DATE_FORMAT)
            .map_err(|e| format!("invalid date '{}': {}", fields[1], e))?;

        let secs: f64 = fields[2]
            .trim()
            .parse()
            .map_err(|_| format!("invalid duration '{}'", fields[2]))?;
        let duration = Duration::try_from_secs_f64(secs)
            .map_err(|_| format!("duration out of range '{}'", fields[2]))?;

        Ok(Self {
            timestamp: fields[0].to_string(),
            date,
            duration,
        })
    }
}

/// Whole seconds are written as integers, anything else as a decimal
fn format_seconds(duration: Duration) -> String {
    if duration.subsec_nanos() == 0 {
        duration.as_secs().to_string()
    } else {
        duration.as_secs_f64().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_line_layout() {
        let at = Local.with_ymd_and_hms(2025, 3, 14, 18, 30, 5).unwrap();
        let record = UsageRecord::new(at, date(2025, 3, 14), Duration::from_secs(754));
        let line = record.to_line();

        assert!(line.ends_with(",2025-03-14,754\n"));
        assert!(line.starts_with("2025-03-14T18:30:05.000"));
        assert_eq!(line.matches(FIELD_DELIMITER).count(), 2);
    }

    #[test]
    fn test_fractional_seconds_written_as_decimal() {
        let at = Local.with_ymd_and_hms(2025, 3, 14, 18, 30, 5).unwrap();
        let record = UsageRecord::new(at, date(2025, 3, 14), Duration::from_millis(1500));
        assert!(record.to_line().ends_with(",1.5\n"));
    }

    #[test]
    fn test_parse_integer_and_float_seconds() {
        let r = UsageRecord::parse_line("2025-03-14T18:30:05,2025-03-14,120\n").unwrap();
        assert_eq!(r.date, date(2025, 3, 14));
        assert_eq!(r.duration, Duration::from_secs(120));

        let r = UsageRecord::parse_line("2025-03-14T18:30:05.123456,2025-03-14,90.5\r\n").unwrap();
        assert_eq!(r.duration, Duration::from_millis(90_500));
    }

    #[test]
    fn test_timestamp_is_not_interpreted() {
        let r = UsageRecord::parse_line("whenever,2025-03-14,1").unwrap();
        assert_eq!(r.timestamp, "whenever");
    }

    #[test]
    fn test_parse_rejects_malformed_lines() {
        for line in [
            "",
            "2025-03-14T18:30:05,2025-03-14",
            "2025-03-14T18:30:05,2025-03-14,1,extra",
            "2025-03-14T18:30:05,14/03/2025,1",
            "2025-03-14T18:30:05,2025-03-14,abc",
            "2025-03-14T18:30:05,2025-03-14,-5",
            "2025-03-14T18:30:05,2025-03-14,NaN",
        ] {
            assert!(UsageRecord::parse_line(line).is_err(), "accepted {:?}", line);
        }
    }
}
