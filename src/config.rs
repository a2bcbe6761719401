//! Configuration sources queried when the value map has no entry for a tag.

use crate::error::{Result, TagError};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// Single-key string lookup. Returns `None` when the key is unknown.
///
/// Keys arrive lower-cased; implementations should compare case-insensitively.
pub trait ConfigLookup {
    fn lookup(&self, key: &str) -> Option<String>;
}

impl<T: ConfigLookup + ?Sized> ConfigLookup for &T {
    fn lookup(&self, key: &str) -> Option<String> {
        (**self).lookup(key)
    }
}

impl<T: ConfigLookup> ConfigLookup for Option<T> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.as_ref().and_then(|inner| inner.lookup(key))
    }
}

impl ConfigLookup for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key)
            .or_else(|| find_ignore_case(self.iter(), key))
            .cloned()
    }
}

impl ConfigLookup for BTreeMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key)
            .or_else(|| find_ignore_case(self.iter(), key))
            .cloned()
    }
}

fn find_ignore_case<'a>(
    mut entries: impl Iterator<Item = (&'a String, &'a String)>,
    key: &str,
) -> Option<&'a String> {
    entries
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(key))
        .map(|(_, value)| value)
}

/// Adapts a closure into a [`ConfigLookup`]
pub struct FnLookup<F>(pub F);

impl<F: Fn(&str) -> Option<String>> ConfigLookup for FnLookup<F> {
    fn lookup(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }
}

/// Hierarchical configuration backed by a JSON document.
///
/// Keys address nested members with `:` or `.` separators (`database:host`,
/// `servers.0.name`); every segment matches case-insensitively.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonSection {
    root: JsonValue,
}

impl JsonSection {
    pub fn from_value(root: JsonValue) -> Self {
        Self { root }
    }

    /// Parses a JSON document
    ///
    /// # Errors
    ///
    /// Returns `TagError::Json` if the text is not valid JSON.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(Self::from_value(serde_json::from_str(text)?))
    }

    /// Loads a JSON document from disk
    ///
    /// # Errors
    ///
    /// - `TagError::Io` if the file cannot be read.
    /// - `TagError::Json` if the file is not valid JSON.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(TagError::Io)?;
        Self::from_json_str(&text)
    }

    /// Narrows to a sub-section. A missing path yields an empty section.
    pub fn section(&self, path: &str) -> Self {
        if path.trim().is_empty() {
            return self.clone();
        }
        Self::from_value(resolve(&self.root, path).cloned().unwrap_or(JsonValue::Null))
    }

    /// True when the section holds no members
    pub fn is_empty(&self) -> bool {
        match &self.root {
            JsonValue::Null => true,
            JsonValue::Object(map) => map.is_empty(),
            JsonValue::Array(items) => items.is_empty(),
            _ => false,
        }
    }
}

impl ConfigLookup for JsonSection {
    fn lookup(&self, key: &str) -> Option<String> {
        resolve(&self.root, key).and_then(scalar_text)
    }
}

/// Walks `key` through the document; a member whose name is the whole key wins
fn resolve<'a>(root: &'a JsonValue, key: &str) -> Option<&'a JsonValue> {
    if let Some(direct) = member(root, key) {
        return Some(direct);
    }

    key.split([':', '.'])
        .try_fold(root, |node, segment| member(node, segment))
}

fn member<'a>(node: &'a JsonValue, name: &str) -> Option<&'a JsonValue> {
    match node {
        JsonValue::Object(map) => map.get(name).or_else(|| {
            map.iter()
                .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        }),
        JsonValue::Array(items) => name.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn scalar_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample() -> JsonSection {
        JsonSection::from_json_str(
            r#"{
                "Sample": "2021",
                "Database": { "Host": "db.local", "Port": 5432, "Ssl": true },
                "servers": [ { "name": "alpha" }, { "name": "beta" } ],
                "dotted.key": "direct",
                "nothing": null
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_json_lookup() {
        let config = sample();
        assert_eq!(config.lookup("sample").as_deref(), Some("2021"));
        assert_eq!(config.lookup("database:host").as_deref(), Some("db.local"));
        assert_eq!(config.lookup("database.port").as_deref(), Some("5432"));
        assert_eq!(config.lookup("DATABASE:SSL").as_deref(), Some("true"));
        assert_eq!(config.lookup("servers:1:name").as_deref(), Some("beta"));
        assert_eq!(config.lookup("dotted.key").as_deref(), Some("direct"));
    }

    #[test]
    fn test_json_lookup_misses() {
        let config = sample();
        assert_eq!(config.lookup("missing"), None);
        assert_eq!(config.lookup("database"), None);
        assert_eq!(config.lookup("servers"), None);
        assert_eq!(config.lookup("nothing"), None);
        assert_eq!(config.lookup("servers:9:name"), None);
    }

    #[test]
    fn test_json_section() {
        let config = sample();
        let database = config.section("database");
        assert!(!database.is_empty());
        assert_eq!(database.lookup("host").as_deref(), Some("db.local"));

        let missing = config.section("nope");
        assert!(missing.is_empty());
        assert_eq!(missing.lookup("host"), None);

        assert_eq!(config.section(""), config);
    }

    #[test]
    fn test_json_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"app": {{"name": "tagbuilder"}}}}"#).unwrap();

        let config = JsonSection::from_file(file.path()).unwrap();
        assert_eq!(config.lookup("app:name").as_deref(), Some("tagbuilder"));

        let err = JsonSection::from_file(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, TagError::Io(_)));
    }

    #[test]
    fn test_map_lookups() {
        let mut map = HashMap::new();
        map.insert("Year".to_string(), "2021".to_string());
        assert_eq!(map.lookup("year").as_deref(), Some("2021"));
        assert_eq!(map.lookup("month"), None);

        let tree: BTreeMap<String, String> =
            [("a:b".to_string(), "c".to_string())].into_iter().collect();
        assert_eq!(tree.lookup("A:B").as_deref(), Some("c"));

        let none: Option<JsonSection> = None;
        assert_eq!(none.lookup("anything"), None);
    }

    #[test]
    fn test_fn_lookup() {
        let lookup = FnLookup(|key: &str| (key == "answer").then(|| "42".to_string()));
        assert_eq!(lookup.lookup("answer").as_deref(), Some("42"));
        assert_eq!(lookup.lookup("question"), None);
    }
}
