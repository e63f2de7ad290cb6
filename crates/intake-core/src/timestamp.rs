//! Wall-clock timestamps for records and reports.

use chrono::{DateTime, FixedOffset, Utc};

use crate::error::ConfigError;

/// Format of every timestamp written by the pipeline.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Produces `YYYY-MM-DD HH:MM` strings in a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    offset: FixedOffset,
}

impl Clock {
    /// Create a clock for an offset in whole hours (e.g. `9` for JST).
    pub fn with_offset_hours(hours: i32) -> Result<Self, ConfigError> {
        let offset = hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| ConfigError::InvalidValue {
                key: "output.utc_offset_hours".to_string(),
                reason: format!("{} is not a valid UTC offset", hours),
            })?;
        Ok(Self { offset })
    }

    /// Current time as a timestamp string.
    pub fn now(&self) -> String {
        self.format(Utc::now())
    }

    /// Format an instant in this clock's offset.
    pub fn format(&self, instant: DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.offset)
            .format(TIMESTAMP_FORMAT)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_in_jst() {
        let clock = Clock::with_offset_hours(9).unwrap();
        let instant = Utc.with_ymd_and_hms(2026, 2, 7, 3, 7, 42).unwrap();
        assert_eq!(clock.format(instant), "2026-02-07 12:07");
    }

    #[test]
    fn test_negative_offset_crosses_date() {
        let clock = Clock::with_offset_hours(-5).unwrap();
        let instant = Utc.with_ymd_and_hms(2024, 1, 10, 2, 0, 0).unwrap();
        assert_eq!(clock.format(instant), "2024-01-09 21:00");
    }

    #[test]
    fn test_invalid_offset() {
        assert!(Clock::with_offset_hours(30).is_err());
    }
}
