//! Conversion of `(type)literal` default values into typed values.

use crate::error::{Result, TagError};
use crate::value::TagValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::str::FromStr;

const DATETIME_FORMATS: &[&str] = &[
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%Y-%m-%d", "%m/%d/%Y"];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

/// Parses a default literal of the form `(typeName)rawValue`.
///
/// Without a well-formed `(typeName)` prefix the whole trimmed literal is a string.
///
/// # Errors
///
/// Returns `TagError::Coercion` if the literal is empty, the type name is unknown
/// or the text does not parse as that type.
pub fn parse_literal(literal: &str) -> Result<TagValue> {
    if literal.is_empty() {
        return Err(TagError::coercion("default", literal, "default value is missing"));
    }

    let Some((type_name, raw)) = split_type_prefix(literal) else {
        return Ok(TagValue::String(literal.trim().to_string()));
    };

    let value = raw.trim();
    match type_name.to_lowercase().as_str() {
        "int" => value
            .parse::<i64>()
            .map(TagValue::Integer)
            .map_err(|e| TagError::coercion(type_name, value, e)),
        "double" => value
            .parse::<f64>()
            .map(TagValue::Double)
            .map_err(|e| TagError::coercion(type_name, value, e)),
        "decimal" => Decimal::from_str(value)
            .map(TagValue::Decimal)
            .map_err(|e| TagError::coercion(type_name, value, e)),
        "datetime" => parse_datetime(value)
            .map(TagValue::DateTime)
            .ok_or_else(|| TagError::coercion(type_name, value, "not a recognised date and time")),
        "dateonly" | "date" => parse_date(value)
            .map(TagValue::Date)
            .ok_or_else(|| TagError::coercion(type_name, value, "not a recognised date")),
        "timeonly" | "time" => parse_time(value)
            .map(TagValue::Time)
            .ok_or_else(|| TagError::coercion(type_name, value, "not a recognised time of day")),
        "bool" => parse_bool(value)
            .map(TagValue::Boolean)
            .ok_or_else(|| TagError::coercion(type_name, value, "expected 'true' or 'false'")),
        "string" => Ok(TagValue::String(value.to_string())),
        _ => Err(TagError::coercion(type_name, value, "unsupported type")),
    }
}

fn split_type_prefix(literal: &str) -> Option<(&str, &str)> {
    let rest = literal.trim_start().strip_prefix('(')?;
    let (type_name, raw) = rest.split_once(')')?;
    let type_name = type_name.trim();

    if type_name.is_empty() || !type_name.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    Some((type_name, raw))
}

/// Case-insensitive `true` / `false`
pub fn parse_bool(text: &str) -> Option<bool> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Parses a date and time; a bare date means midnight
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| parse_date_only(text).and_then(|d| d.and_hms_opt(0, 0, 0)))
}

/// Parses a date, accepting a full date and time and keeping only the date
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    parse_date_only(text).or_else(|| parse_datetime(text).map(|dt| dt.date()))
}

/// Parses a time of day, accepting a full date and time and keeping only the time
pub fn parse_time(text: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(text, fmt).ok())
        .or_else(|| parse_datetime(text).map(|dt| dt.time()))
}

fn parse_date_only(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}
