//! Tag grammar: the compiled patterns recognising live tags, escaped tags,
//! the reserved generator tags and the `[format:..]` / `[default:..]` clause.

use crate::error::{Result, TagError};
use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

/// Default pattern for a live tag: `${key}`, `${key:[..]}` or `${key=[..]}`
pub const REGULAR_PATTERN: &str = r"\$\{(?P<var>\w+(?:[:|.]*\w+)*)(?P<extended>[=:]?\[.*?\])?\}";

/// Escaped tag: `$${{key}}`, restored to `${key}` once expansion settles
pub const ESCAPED_PATTERN: &str =
    r"\$\$\{\{(?P<var>\w+(?:[:|.]*\w+)*)(?P<extended>[=:]?\[.*?\])?\}\}";

/// `${randomnumber:[min]}` or `${randomnumber:[min,max]}`, optionally followed by a format clause
pub const RANDOM_NUMBER_PATTERN: &str = r"\$\{randomnumber:\[(?P<min>\d+)(?:\s*,\s*(?P<max>\d+))?\](?:\[format:(?P<format>.*?)\])?\}";

/// `${randomstring:[length]}`
pub const RANDOM_STRING_PATTERN: &str = r"\$\{randomstring:\[(?P<length>\d+)\]\}";

/// Body of an extended clause, matched repeatedly
pub const EXTENDED_PATTERN: &str =
    r"(?P<format>\[format:(?P<formvalue>.*?)\])|(?P<default>\[default:(?P<defvalue>.*?)\])";

fn compile(pattern: &str) -> Result<Regex> {
    Ok(RegexBuilder::new(pattern)
        .case_insensitive(true)
        .multi_line(true)
        .build()?)
}

static REGULAR_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(REGULAR_PATTERN).expect("built-in tag pattern compiles"));
static ESCAPED_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(ESCAPED_PATTERN).expect("built-in escape pattern compiles"));
static RANDOM_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile(RANDOM_NUMBER_PATTERN).expect("built-in random number pattern compiles")
});
static RANDOM_STRING_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile(RANDOM_STRING_PATTERN).expect("built-in random string pattern compiles")
});
static EXTENDED_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(EXTENDED_PATTERN).expect("built-in clause pattern compiles"));

/// A tag located in an expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMatch {
    /// The exact matched text, e.g. `${Sample=[default:(int)10]}`
    pub raw: String,
    /// Identifier chain as written in the tag
    pub var: String,
    /// Lower-cased identifier chain used for lookups
    pub key: String,
    /// Extended clause including its leading `=` or `:`, if present
    pub extended: Option<String>,
    /// Starting byte offset in the expression
    pub start: usize,
    /// Ending byte offset in the expression
    pub end: usize,
}

/// Parsed `[format:..]` / `[default:..]` segments of an extended clause
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedClause {
    pub format: Option<String>,
    pub default: Option<String>,
}

impl ExtendedClause {
    /// True when neither segment was found
    pub fn is_empty(&self) -> bool {
        self.format.is_none() && self.default.is_none()
    }
}

/// Arguments of a `${randomnumber:[..]}` tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomNumberArgs {
    pub min: String,
    pub max: Option<String>,
    pub format: Option<String>,
}

/// The set of patterns used by one builder. Only the regular tag pattern can be replaced.
#[derive(Debug, Clone)]
pub struct TagGrammar {
    regular: Regex,
}

impl Default for TagGrammar {
    fn default() -> Self {
        Self::new()
    }
}

impl TagGrammar {
    pub fn new() -> Self {
        Self {
            regular: REGULAR_RE.clone(),
        }
    }

    /// Uses a caller-supplied pattern for live tags, e.g. for custom delimiters.
    ///
    /// # Errors
    ///
    /// - `TagError::InvalidInput` if the pattern is empty or has no `var` group.
    /// - `TagError::Regex` if the pattern does not compile.
    pub fn with_regular_pattern(pattern: &str) -> Result<Self> {
        if pattern.trim().is_empty() {
            return Err(TagError::invalid_input("tag pattern is empty"));
        }

        let regular = compile(pattern)?;
        if !regular.capture_names().flatten().any(|name| name == "var") {
            return Err(TagError::invalid_input(format!(
                "tag pattern has no 'var' capture group: {pattern}"
            )));
        }

        Ok(Self { regular })
    }

    /// The active pattern for live tags
    pub fn search_pattern(&self) -> &str {
        self.regular.as_str()
    }

    /// Finds all live tags in the expression
    pub fn find_tags(&self, expression: &str) -> Vec<TagMatch> {
        collect_matches(&self.regular, expression)
    }

    /// Finds all escaped tags in the expression
    pub fn find_escaped(&self, expression: &str) -> Vec<TagMatch> {
        collect_matches(&ESCAPED_RE, expression)
    }

    /// Restores every escaped tag to a plain `${key}`, dropping any extended clause
    pub fn unescape(&self, expression: &str) -> String {
        ESCAPED_RE
            .replace_all(expression, |caps: &regex::Captures<'_>| {
                format!("${{{}}}", &caps["var"])
            })
            .into_owned()
    }
}

fn collect_matches(pattern: &Regex, expression: &str) -> Vec<TagMatch> {
    let mut tags = Vec::new();

    for capture in pattern.captures_iter(expression) {
        if let Some(full_match) = capture.get(0)
            && let Some(var) = capture.name("var")
        {
            tags.push(TagMatch {
                raw: full_match.as_str().to_string(),
                var: var.as_str().to_string(),
                key: var.as_str().to_lowercase(),
                extended: capture.name("extended").map(|m| m.as_str().to_string()),
                start: full_match.start(),
                end: full_match.end(),
            });
        }
    }

    tags
}

/// Splits an extended clause into its format and default segments.
///
/// Segments may come in either order; the first occurrence of each wins.
pub fn parse_extended(clause: &str) -> ExtendedClause {
    let mut parsed = ExtendedClause::default();

    for capture in EXTENDED_RE.captures_iter(clause) {
        if parsed.format.is_none()
            && let Some(format) = capture.name("formvalue")
        {
            parsed.format = Some(format.as_str().to_string());
        }
        if parsed.default.is_none()
            && let Some(default) = capture.name("defvalue")
        {
            parsed.default = Some(default.as_str().to_string());
        }
    }

    parsed
}

/// Extracts the bounds of a random number tag
pub fn random_number_args(token: &str) -> Option<RandomNumberArgs> {
    RANDOM_NUMBER_RE.captures(token).map(|caps| RandomNumberArgs {
        min: caps["min"].to_string(),
        max: caps.name("max").map(|m| m.as_str().to_string()),
        format: caps.name("format").map(|m| m.as_str().to_string()),
    })
}

/// Extracts the length of a random string tag
pub fn random_string_length(token: &str) -> Option<String> {
    RANDOM_STRING_RE
        .captures(token)
        .map(|caps| caps["length"].to_string())
}
