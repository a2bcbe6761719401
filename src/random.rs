//! Built-in `randomnumber` / `randomstring` generators backed by the OS random source.

use crate::error::{Result, TagError};
use crate::format::format_object;
use crate::value::TagValue;
use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;

pub const RANDOM_NUMBER: &str = "randomnumber";
pub const RANDOM_STRING: &str = "randomstring";

/// Longest string `randomstring` will generate
pub const MAX_STRING_LENGTH: usize = 65_536;

/// Draws an integer from `[min, max)`. A missing `max` means 0; reversed bounds are swapped.
///
/// # Errors
///
/// - `TagError::Coercion` if the range is empty.
/// - `TagError::UnsupportedFormat` if the format does not apply to integers.
pub fn random_number(min: i64, max: Option<i64>, format: &str) -> Result<String> {
    let mut low = min;
    let mut high = max.unwrap_or(0);
    if low > high {
        std::mem::swap(&mut low, &mut high);
    }

    if low == high {
        return Err(TagError::coercion(
            RANDOM_NUMBER,
            format!("[{min},{}]", max.unwrap_or(0)),
            "range is empty",
        ));
    }

    let value = OsRng.gen_range(low..high);
    format_object(&TagValue::Integer(value), format)
}

/// Alphanumeric string of exactly `length` characters
pub fn random_string(length: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Parses and bounds the length argument of `randomstring`
pub(crate) fn parse_length(text: &str) -> Result<usize> {
    let length = text
        .parse::<usize>()
        .map_err(|e| TagError::coercion(RANDOM_STRING, text, e))?;
    if length > MAX_STRING_LENGTH {
        return Err(TagError::coercion(
            RANDOM_STRING,
            text,
            format!("length exceeds {MAX_STRING_LENGTH}"),
        ));
    }
    Ok(length)
}

/// Parses a generator argument captured by the tag grammar
pub(crate) fn parse_argument(name: &str, text: &str) -> Result<i64> {
    text.parse::<i64>()
        .map_err(|e| TagError::coercion(name, text, e))
}
