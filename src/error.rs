use std::io;
use thiserror::Error;

/// Main error type for tag resolution
#[derive(Error, Debug)]
pub enum TagError {
    /// Empty expression, empty tag pattern or an unusable custom pattern
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Tags that survived a full pass unchanged while running in strict mode
    #[error("Cannot find a key '{}', so the expression is not resolved!", .tokens.join(", "))]
    Unresolved { tokens: Vec<String> },

    /// Extended clause holding neither a `format:` nor a `default:` segment
    #[error("Malformed extended clause: {clause}")]
    MalformedClause { clause: String },

    /// Default literal with an unknown type name or unparsable text
    #[error("Cannot convert '{value}' to type [{type_name}]: {message}")]
    Coercion {
        type_name: String,
        value: String,
        message: String,
    },

    /// A value kind that has no formatting rule for the requested specifier
    #[error("Unsupported format '{format}' for value of kind {kind}")]
    UnsupportedFormat { kind: &'static str, format: String },

    /// Key passed the reserved-keyword gate without matching a generator
    #[error("Unknown reserved keyword: {key}")]
    UnknownReserved { key: String },

    /// Expansion did not converge within the configured number of passes
    #[error("Expression did not converge after {limit} passes")]
    IterationLimit { limit: usize },

    /// Regex compilation error
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// IO error when reading templates or configuration files
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error when loading value maps or configuration sections
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TagError {
    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub(crate) fn coercion(
        type_name: impl Into<String>,
        value: impl Into<String>,
        message: impl ToString,
    ) -> Self {
        Self::Coercion {
            type_name: type_name.into(),
            value: value.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TagError>;
