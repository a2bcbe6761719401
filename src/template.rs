use crate::coerce::parse_literal;
use crate::config::ConfigLookup;
use crate::error::{Result, TagError};
use crate::format::format_object;
use crate::grammar::{self, TagGrammar, TagMatch};
use crate::random::{self, RANDOM_NUMBER, RANDOM_STRING};
use crate::secret::{
    CryptoProvider, IdentityProvider, SECRET_MARKER, SHASEC_MARKER, SecretWrapper, strip_marker,
};
use crate::standard;
use crate::value::TagValues;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, debug_span, trace, warn};
use uuid::Uuid;

/// Default ceiling on substitution passes before expansion is abandoned
pub const MAX_ITERATIONS: usize = 64;

/// Configuration for tag expansion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderOptions {
    /// Lower-case resolved values that read as booleans (`True` -> `true`)
    pub bool_to_lower: bool,
    /// Maximum number of substitution passes that may make progress
    pub max_iterations: usize,
    /// Restore escaped tags even when the expression had no live tags at all
    pub unescape_on_first_pass: bool,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            bool_to_lower: true,
            max_iterations: MAX_ITERATIONS,
            unescape_on_first_pass: true,
        }
    }
}

/// Per-call inputs of [`TemplateTagsBuilder::parse_with`]
#[derive(Clone, Copy, Default)]
pub struct ParseOptions<'a> {
    pub values: Option<&'a TagValues>,
    pub config: Option<&'a dyn ConfigLookup>,
    /// Fail with `TagError::Unresolved` instead of returning partially resolved text
    pub strict: bool,
    pub crypto: Option<&'a dyn CryptoProvider>,
}

impl<'a> ParseOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn values(mut self, values: &'a TagValues) -> Self {
        self.values = Some(values);
        self
    }

    #[must_use]
    pub fn config(mut self, config: &'a dyn ConfigLookup) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    #[must_use]
    pub fn crypto(mut self, crypto: &'a dyn CryptoProvider) -> Self {
        self.crypto = Some(crypto);
        self
    }
}

/// Inputs shared by every tag of one `parse` call
struct Sources<'a> {
    values: &'a TagValues,
    config: Option<&'a dyn ConfigLookup>,
    crypto: &'a dyn CryptoProvider,
}

/// Resolves `${...}` tags in text until the text stops changing
#[derive(Debug, Clone, Default)]
pub struct TemplateTagsBuilder {
    grammar: TagGrammar,
    options: BuilderOptions,
}

impl TemplateTagsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder whose live tags are recognised by a custom pattern.
    ///
    /// The pattern must capture the key in a group named `var` and may capture an
    /// extended clause in a group named `extended`.
    ///
    /// # Errors
    ///
    /// Returns `TagError::InvalidInput` or `TagError::Regex` for an unusable pattern.
    pub fn with_pattern(pattern: &str) -> Result<Self> {
        Ok(Self {
            grammar: TagGrammar::with_regular_pattern(pattern)?,
            options: BuilderOptions::default(),
        })
    }

    #[must_use]
    pub fn with_options(mut self, options: BuilderOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn bool_to_lower(mut self, enabled: bool) -> Self {
        self.options.bool_to_lower = enabled;
        self
    }

    #[must_use]
    pub fn max_iterations(mut self, limit: usize) -> Self {
        self.options.max_iterations = limit;
        self
    }

    #[must_use]
    pub fn unescape_on_first_pass(mut self, enabled: bool) -> Self {
        self.options.unescape_on_first_pass = enabled;
        self
    }

    pub fn options(&self) -> &BuilderOptions {
        &self.options
    }

    /// The active pattern for live tags
    pub fn search_pattern(&self) -> &str {
        self.grammar.search_pattern()
    }

    /// Lists the live tags of an expression without resolving them
    pub fn find_tags(&self, expression: &str) -> Vec<TagMatch> {
        self.grammar.find_tags(expression)
    }

    /// See [`standard::standard_tags`]
    pub fn standard_tags(&self) -> TagValues {
        standard::standard_tags()
    }

    /// See [`standard::standard_tags_with`]
    pub fn standard_tags_with(&self, values: &TagValues) -> TagValues {
        standard::standard_tags_with(values)
    }

    /// Resolves every tag of the expression.
    ///
    /// Tags are looked up, in order, as reserved generators, in `values`, in
    /// `config`, and finally through a `[default:..]` clause. Substitution repeats
    /// until no live tags remain or a pass changes nothing.
    ///
    /// # Errors
    ///
    /// - `TagError::InvalidInput` if the expression is empty.
    /// - `TagError::Unresolved` in strict mode when tags cannot be resolved.
    /// - `TagError::MalformedClause`, `TagError::Coercion`, `TagError::UnsupportedFormat`
    ///   or `TagError::UnknownReserved` when a tag cannot be evaluated.
    /// - `TagError::IterationLimit` if expansion keeps producing new tags.
    pub fn parse(
        &self,
        expression: &str,
        values: Option<&TagValues>,
        config: Option<&dyn ConfigLookup>,
        strict: bool,
        crypto: Option<&dyn CryptoProvider>,
    ) -> Result<String> {
        self.parse_with(
            expression,
            ParseOptions {
                values,
                config,
                strict,
                crypto,
            },
        )
    }

    /// Same as [`TemplateTagsBuilder::parse`], taking the inputs as [`ParseOptions`]
    ///
    /// # Errors
    ///
    /// See [`TemplateTagsBuilder::parse`].
    pub fn parse_with(&self, expression: &str, options: ParseOptions<'_>) -> Result<String> {
        let correlation_id = Uuid::new_v4();
        let span = debug_span!("parse", %correlation_id);
        let _entered = span.enter();
        let started = Instant::now();

        let empty = TagValues::new();
        let sources = Sources {
            values: options.values.unwrap_or(&empty),
            config: options.config,
            crypto: options.crypto.unwrap_or(&IdentityProvider),
        };

        let result = self.expand(expression, &sources, options.strict);
        debug!(
            elapsed_us = started.elapsed().as_micros() as u64,
            ok = result.is_ok(),
            "Finished parsing expression"
        );
        result
    }

    fn expand(&self, expression: &str, sources: &Sources<'_>, strict: bool) -> Result<String> {
        if expression.is_empty() {
            return Err(TagError::invalid_input("expression is empty"));
        }
        if self.grammar.search_pattern().is_empty() {
            return Err(TagError::invalid_input("tag pattern is empty"));
        }

        let mut current = expression.to_string();
        let mut iteration = 0;

        loop {
            trace!(iteration, "Parsing expression");
            let tags = self.grammar.find_tags(&current);

            if tags.is_empty() {
                if iteration == 0 {
                    warn!("No matches found in expression, and the expression is not resolved!");
                    if !self.options.unescape_on_first_pass {
                        return Ok(current);
                    }
                } else {
                    trace!(iteration, "No tags left in expression");
                }
                return Ok(self.grammar.unescape(&current));
            }

            if iteration >= self.options.max_iterations {
                return Err(TagError::IterationLimit {
                    limit: self.options.max_iterations,
                });
            }

            debug!(count = tags.len(), iteration, "Found matches in expression");
            let resolved = self.substitute(&current, &tags, sources)?;

            if resolved == current {
                if strict {
                    return Err(TagError::Unresolved {
                        tokens: tags.into_iter().map(|tag| tag.raw).collect(),
                    });
                }
                warn!("Cannot find a key, so the expression is not completely resolved!");
                return Ok(resolved);
            }

            current = resolved;
            iteration += 1;
        }
    }

    /// Builds the text of one pass. Identical tokens are resolved once and share the result.
    fn substitute(&self, text: &str, tags: &[TagMatch], sources: &Sources<'_>) -> Result<String> {
        let mut resolved: HashMap<&str, Option<String>> = HashMap::new();
        let mut result = String::with_capacity(text.len());
        let mut last = 0;

        for tag in tags {
            result.push_str(&text[last..tag.start]);

            let replacement = match resolved.get(tag.raw.as_str()) {
                Some(cached) => cached.clone(),
                None => {
                    let value = self.resolve_tag(tag, sources)?;
                    resolved.insert(tag.raw.as_str(), value.clone());
                    value
                }
            };

            result.push_str(replacement.as_deref().unwrap_or(&tag.raw));
            last = tag.end;
        }

        result.push_str(&text[last..]);
        Ok(result)
    }

    /// Resolves one tag; `None` leaves it in place for this pass
    fn resolve_tag(&self, tag: &TagMatch, sources: &Sources<'_>) -> Result<Option<String>> {
        let (key, is_secret) = strip_marker(&tag.key);
        let clause = tag
            .extended
            .as_deref()
            .map(grammar::parse_extended)
            .unwrap_or_default();
        let format = clause.format.as_deref().unwrap_or("");

        let value = if is_reserved(key) {
            Some(resolve_reserved(tag, key, format)?)
        } else if let Some(value) = sources.values.get(key) {
            Some(format_object(value, format)?)
        } else if let Some(text) = sources.config.and_then(|config| config.lookup(key)) {
            Some(text)
        } else if let Some(extended) = tag.extended.as_deref() {
            if clause.is_empty() {
                return Err(TagError::MalformedClause {
                    clause: extended.to_string(),
                });
            }
            let default = parse_literal(clause.default.as_deref().unwrap_or(""))?;
            Some(format_object(&default, format)?)
        } else {
            None
        };

        Ok(value.map(|value| {
            trace!(key, "Replacing value");
            SecretWrapper {
                bool_to_lower: self.options.bool_to_lower,
            }
            .wrap(key, &tag.raw, value, is_secret, sources.crypto)
        }))
    }
}

fn is_reserved(key: &str) -> bool {
    [RANDOM_NUMBER, RANDOM_STRING, SECRET_MARKER, SHASEC_MARKER].contains(&key)
}

/// Runs a generator. Arguments are read from the tag rebuilt without its secret marker.
fn resolve_reserved(tag: &TagMatch, key: &str, format: &str) -> Result<String> {
    let canonical = format!("${{{key}{}}}", tag.extended.as_deref().unwrap_or(""));
    let malformed = || TagError::MalformedClause {
        clause: tag.raw.clone(),
    };

    if key.starts_with(RANDOM_STRING) {
        debug!("Generating random string");
        let length = grammar::random_string_length(&canonical).ok_or_else(malformed)?;
        return Ok(random::random_string(random::parse_length(&length)?));
    }

    if key.starts_with(RANDOM_NUMBER) {
        debug!("Generating random number");
        let args = grammar::random_number_args(&canonical).ok_or_else(malformed)?;
        let min = random::parse_argument(RANDOM_NUMBER, &args.min)?;
        let max = args
            .max
            .as_deref()
            .map(|max| random::parse_argument(RANDOM_NUMBER, max))
            .transpose()?;
        let format = args.format.as_deref().unwrap_or(format);
        return random::random_number(min, max, format);
    }

    Err(TagError::UnknownReserved {
        key: key.to_string(),
    })
}

/// Resolves an expression against a value map with default settings
///
/// # Errors
///
/// See [`TemplateTagsBuilder::parse`].
pub fn parse(expression: &str, values: &TagValues) -> Result<String> {
    TemplateTagsBuilder::new().parse(expression, Some(values), None, false, None)
}
