//! Standard tags describing the running environment and the current UTC time.

use crate::value::TagValues;
use chrono::{Datelike, NaiveDateTime, Timelike, Utc};
use std::env;

/// Number of entries produced by [`standard_tags`]
pub const STANDARD_TAG_COUNT: usize = 14;

/// Builds the standard tag set from the current UTC time and host environment
pub fn standard_tags() -> TagValues {
    standard_tags_at(Utc::now().naive_utc())
}

/// Standard tags overlaid with caller values; the caller wins on conflicts
pub fn standard_tags_with(values: &TagValues) -> TagValues {
    let mut tags = standard_tags();
    tags.merge(values);
    tags
}

pub(crate) fn standard_tags_at(now: NaiveDateTime) -> TagValues {
    let host = host_name();
    let domain = env::var("USERDOMAIN").unwrap_or_else(|_| host.clone());

    let mut tags = TagValues::new();
    tags.insert("Version", env!("CARGO_PKG_VERSION"));
    tags.insert("Year", now.year());
    tags.insert("Month", now.format("%B").to_string());
    tags.insert("Day", now.day());
    tags.insert("DayOfWeek", now.format("%A").to_string());
    tags.insert("Hour", now.hour());
    tags.insert("Minute", now.minute());
    tags.insert("Second", now.second());
    tags.insert("DayOfYear", now.ordinal());
    tags.insert("Now", now);
    tags.insert("HostName", host.as_str());
    tags.insert("MachineName", host.as_str());
    tags.insert("CurrentUser", whoami::username());
    tags.insert("UserDomainName", domain);
    tags
}

fn host_name() -> String {
    whoami::fallible::hostname().unwrap_or_else(|_| whoami::devicename())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::TagValue;
    use chrono::NaiveDate;

    fn fixed_now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 11, 1)
            .unwrap()
            .and_hms_opt(12, 30, 45)
            .unwrap()
    }

    #[test]
    fn test_standard_tags_count() {
        let tags = standard_tags();
        assert_eq!(tags.len(), STANDARD_TAG_COUNT);
        for key in [
            "Version",
            "Year",
            "Month",
            "Day",
            "DayOfWeek",
            "Hour",
            "Minute",
            "Second",
            "DayOfYear",
            "Now",
            "HostName",
            "MachineName",
            "CurrentUser",
            "UserDomainName",
        ] {
            assert!(tags.contains_key(key), "missing standard tag {key}");
        }
    }

    #[test]
    fn test_standard_tag_values() {
        let tags = standard_tags_at(fixed_now());
        assert_eq!(tags.get("year"), Some(&TagValue::Integer(2024)));
        assert_eq!(tags.get("month"), Some(&TagValue::from("November")));
        assert_eq!(tags.get("day"), Some(&TagValue::Integer(1)));
        assert_eq!(tags.get("dayofweek"), Some(&TagValue::from("Friday")));
        assert_eq!(tags.get("hour"), Some(&TagValue::Integer(12)));
        assert_eq!(tags.get("minute"), Some(&TagValue::Integer(30)));
        assert_eq!(tags.get("second"), Some(&TagValue::Integer(45)));
        assert_eq!(tags.get("dayofyear"), Some(&TagValue::Integer(306)));
        assert_eq!(tags.get("now"), Some(&TagValue::DateTime(fixed_now())));
        assert_eq!(
            tags.get("version"),
            Some(&TagValue::from(env!("CARGO_PKG_VERSION")))
        );
        assert_eq!(tags.get("hostname"), tags.get("machinename"));
    }

    #[test]
    fn test_standard_tags_with_overrides() {
        let values = TagValues::new().with("Year", 2021).with("extra", "x");
        let tags = standard_tags_with(&values);
        assert_eq!(tags.len(), STANDARD_TAG_COUNT + 1);
        assert_eq!(tags.get("year"), Some(&TagValue::Integer(2021)));
        assert_eq!(tags.get("extra"), Some(&TagValue::from("x")));
    }
}
