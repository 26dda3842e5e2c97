//! Timestamp formatting shared by the cache and the sync backend.
//!
//! The cache stores timestamps as `"2019-07-23 14:05:09"` strings (UTC). The
//! sync backend stores real `DateTime<Utc>` values.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Cache timestamp format.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, Default)]
pub struct DateUtil;

impl DateUtil {
    pub fn new() -> Self {
        Self
    }

    /// Current time in cache format.
    pub fn current_timestamp(&self) -> String {
        self.format(Utc::now())
    }

    pub fn format(&self, at: DateTime<Utc>) -> String {
        at.format(DATE_FORMAT).to_string()
    }

    pub fn parse(&self, date: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        NaiveDateTime::parse_from_str(date, DATE_FORMAT).map(|naive| naive.and_utc())
    }

    /// `"2019-07-23 14:05:09"` -> `"2019-07-23"`. Strings without a time are returned as is.
    pub fn remove_time_from_date_string(&self, date: &str) -> String {
        match date.split_once(' ') {
            Some((day, _)) => day.to_string(),
            None => date.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_and_parse() {
        let util = DateUtil::new();
        let at = Utc.with_ymd_and_hms(2019, 7, 23, 14, 5, 9).unwrap();

        let text = util.format(at);
        assert_eq!(text, "2019-07-23 14:05:09");
        assert_eq!(util.parse(&text).unwrap(), at);
    }

    #[test]
    fn test_parse_rejects_other_formats() {
        assert!(DateUtil::new().parse("2019-07-23T14:05:09Z").is_err());
    }

    #[test]
    fn test_remove_time() {
        let util = DateUtil::new();
        assert_eq!(util.remove_time_from_date_string("2019-07-23 14:05:09"), "2019-07-23");
        assert_eq!(util.remove_time_from_date_string("2019-07-23"), "2019-07-23");
    }

    #[test]
    fn test_current_timestamp_round_trips() {
        let util = DateUtil::new();
        let now = util.current_timestamp();
        assert!(util.parse(&now).is_ok());
    }
}
