//! Typed values a tag can resolve to, and the case-insensitive map holding them.

use crate::error::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Formatting contract for caller-defined values stored in a [`TagValues`] map
pub trait FormatValue: fmt::Debug + Send + Sync {
    /// Text used when the tag carries no format specifier
    fn to_text(&self) -> String;

    /// Text for a non-empty format specifier, or `None` when the specifier is not supported
    fn format(&self, _spec: &str) -> Option<String> {
        None
    }
}

/// A value a tag can resolve to
#[derive(Debug, Clone)]
pub enum TagValue {
    Integer(i64),
    Double(f64),
    Decimal(Decimal),
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
    Boolean(bool),
    String(String),
    Opaque(Arc<dyn FormatValue>),
}

impl TagValue {
    /// Short name of the value kind, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Integer(_) => "Integer",
            Self::Double(_) => "Double",
            Self::Decimal(_) => "Decimal",
            Self::DateTime(_) => "DateTime",
            Self::Date(_) => "Date",
            Self::Time(_) => "Time",
            Self::Boolean(_) => "Boolean",
            Self::String(_) => "String",
            Self::Opaque(_) => "Opaque",
        }
    }

    /// Wraps a caller-defined formattable value
    pub fn opaque(value: impl FormatValue + 'static) -> Self {
        Self::Opaque(Arc::new(value))
    }
}

impl PartialEq for TagValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a == b,
            (Self::Decimal(a), Self::Decimal(b)) => a == b,
            (Self::DateTime(a), Self::DateTime(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Time(a), Self::Time(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Opaque(a), Self::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

macro_rules! impl_from {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for TagValue {
                fn from(value: $source) -> Self {
                    Self::$variant(value.into())
                }
            }
        )*
    };
}

impl_from! {
    i8 => Integer,
    i16 => Integer,
    i32 => Integer,
    i64 => Integer,
    u8 => Integer,
    u16 => Integer,
    u32 => Integer,
    f32 => Double,
    f64 => Double,
    Decimal => Decimal,
    NaiveDateTime => DateTime,
    NaiveDate => Date,
    NaiveTime => Time,
    bool => Boolean,
    String => String,
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for TagValue {
    fn from(value: DateTime<Tz>) -> Self {
        Self::DateTime(value.naive_utc())
    }
}

/// Caller-owned map of tag values. Keys are compared case-insensitively.
///
/// An entry may hold `None`; such a key is present but never resolves a tag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagValues {
    entries: HashMap<String, Option<TagValue>>,
}

impl TagValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a value, returning the previous entry
    pub fn insert(
        &mut self,
        key: impl AsRef<str>,
        value: impl Into<TagValue>,
    ) -> Option<Option<TagValue>> {
        self.entries
            .insert(normalize(key.as_ref()), Some(value.into()))
    }

    /// Inserts a present-but-null entry
    pub fn insert_null(&mut self, key: impl AsRef<str>) -> Option<Option<TagValue>> {
        self.entries.insert(normalize(key.as_ref()), None)
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, key: impl AsRef<str>, value: impl Into<TagValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Looks a key up. `None` when the key is missing or holds null.
    pub fn get(&self, key: &str) -> Option<&TagValue> {
        self.entries.get(&normalize(key)).and_then(Option::as_ref)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&normalize(key))
    }

    pub fn remove(&mut self, key: &str) -> Option<Option<TagValue>> {
        self.entries.remove(&normalize(key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(normalized key, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&TagValue>)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_ref()))
    }

    /// Copies every entry of `other` over this map; `other` wins on conflicts
    pub fn merge(&mut self, other: &TagValues) {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
    }

    /// Builds a value map from a JSON object.
    ///
    /// Nested objects are flattened into dotted keys, arrays are kept as their JSON text.
    ///
    /// # Errors
    ///
    /// Returns `TagError::Json` if the text is not valid JSON, or `TagError::InvalidInput`
    /// if the top-level value is not an object.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let json: JsonValue = serde_json::from_str(text)?;
        Self::from_json(&json)
    }

    /// See [`TagValues::from_json_str`]
    ///
    /// # Errors
    ///
    /// Returns `TagError::InvalidInput` if the value is not a JSON object.
    pub fn from_json(json: &JsonValue) -> Result<Self> {
        let JsonValue::Object(map) = json else {
            return Err(crate::error::TagError::invalid_input(
                "tag values must be a JSON object",
            ));
        };

        let mut values = Self::new();
        for (key, value) in map {
            flatten_json(&mut values, key, value);
        }
        Ok(values)
    }
}

fn flatten_json(values: &mut TagValues, prefix: &str, json: &JsonValue) {
    match json {
        JsonValue::Null => {
            values.insert_null(prefix);
        }
        JsonValue::Bool(b) => {
            values.insert(prefix, *b);
        }
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                values.insert(prefix, i);
            } else if let Some(f) = n.as_f64() {
                values.insert(prefix, f);
            }
        }
        JsonValue::String(s) => {
            values.insert(prefix, s.as_str());
        }
        JsonValue::Array(_) => {
            values.insert(prefix, json.to_string());
        }
        JsonValue::Object(map) => {
            for (key, value) in map {
                flatten_json(values, &format!("{prefix}.{key}"), value);
            }
        }
    }
}

fn normalize(key: &str) -> String {
    key.to_lowercase()
}

impl<K: AsRef<str>, V: Into<TagValue>> FromIterator<(K, V)> for TagValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = Self::new();
        values.extend(iter);
        values
    }
}

impl<K: AsRef<str>, V: Into<TagValue>> Extend<(K, V)> for TagValues {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Version(u32, u32);

    impl FormatValue for Version {
        fn to_text(&self) -> String {
            format!("{}.{}", self.0, self.1)
        }
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let mut values = TagValues::new();
        values.insert("Year", 2024);
        assert_eq!(values.get("year"), Some(&TagValue::Integer(2024)));
        assert_eq!(values.get("YEAR"), Some(&TagValue::Integer(2024)));
        assert!(values.contains_key("yEaR"));

        values.insert("YEAR", 2025);
        assert_eq!(values.len(), 1);
        assert_eq!(values.get("Year"), Some(&TagValue::Integer(2025)));
    }

    #[test]
    fn test_null_entries() {
        let mut values = TagValues::new();
        values.insert_null("empty");
        assert!(values.contains_key("empty"));
        assert_eq!(values.get("empty"), None);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(TagValue::from(21), TagValue::Integer(21));
        assert_eq!(TagValue::from(10.5), TagValue::Double(10.5));
        assert_eq!(TagValue::from(true), TagValue::Boolean(true));
        assert_eq!(TagValue::from("x"), TagValue::String("x".to_string()));
        assert_eq!(TagValue::from(true).kind(), "Boolean");

        let date = NaiveDate::from_ymd_opt(2024, 11, 1).unwrap();
        assert_eq!(TagValue::from(date), TagValue::Date(date));
    }

    #[test]
    fn test_opaque_values() {
        let value = TagValue::opaque(Version(1, 2));
        assert_eq!(value.kind(), "Opaque");
        let TagValue::Opaque(inner) = &value else {
            panic!("expected opaque value");
        };
        assert_eq!(inner.to_text(), "1.2");
        assert_eq!(inner.format("x"), None);
        assert_eq!(value, value.clone());
    }

    #[test]
    fn test_collect_and_merge() {
        let mut base: TagValues = [("a", 1), ("b", 2)].into_iter().collect();
        let overlay = TagValues::new().with("B", "two").with("c", false);
        base.merge(&overlay);

        assert_eq!(base.len(), 3);
        assert_eq!(base.get("a"), Some(&TagValue::Integer(1)));
        assert_eq!(base.get("b"), Some(&TagValue::String("two".to_string())));
        assert_eq!(base.get("c"), Some(&TagValue::Boolean(false)));
    }

    #[test]
    fn test_from_json() {
        let values = TagValues::from_json_str(
            r#"{"Name": "app", "port": 8080, "ratio": 0.5, "debug": true,
                "db": {"Host": "localhost", "pool": {"size": 4}}, "tags": [1, 2], "none": null}"#,
        )
        .unwrap();

        assert_eq!(values.get("name"), Some(&TagValue::String("app".to_string())));
        assert_eq!(values.get("port"), Some(&TagValue::Integer(8080)));
        assert_eq!(values.get("ratio"), Some(&TagValue::Double(0.5)));
        assert_eq!(values.get("debug"), Some(&TagValue::Boolean(true)));
        assert_eq!(
            values.get("db.host"),
            Some(&TagValue::String("localhost".to_string()))
        );
        assert_eq!(values.get("db.pool.size"), Some(&TagValue::Integer(4)));
        assert_eq!(values.get("tags"), Some(&TagValue::String("[1,2]".to_string())));
        assert!(values.contains_key("none"));
        assert_eq!(values.get("none"), None);
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        assert!(matches!(
            TagValues::from_json_str("[1, 2]"),
            Err(crate::error::TagError::InvalidInput { .. })
        ));
        assert!(matches!(
            TagValues::from_json_str("{broken"),
            Err(crate::error::TagError::Json(_))
        ));
    }
}
