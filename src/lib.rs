//! # tagbuilder
//!
//! A library and CLI tool for resolving `${...}` placeholder tags in text. Values come
//! from a caller-supplied map, a configuration source, built-in generators or a typed
//! default written into the tag itself.
//!
//! ## Features
//!
//! - Case-insensitive keys with `:` and `.` separators: `${Database:Host}`
//! - .NET-style format strings: `${count:[format:000]}`, `${now:[format:yyyy-MM-dd]}`
//! - Typed defaults: `${port=[default:(int)8080]}`
//! - Random generators: `${randomnumber:[1,100]}`, `${randomstring:[16]}`
//! - Secret markers routed through a pluggable provider: `${secret:password}`
//! - Escaped tags that survive expansion: `$${{literal}}` becomes `${literal}`
//! - Repeated expansion, so values may themselves contain tags
//!
//! ## Usage
//!
//! ### As a Library
//!
//! ```
//! use tagbuilder::{TagValues, TemplateTagsBuilder};
//!
//! let values = TagValues::new().with("name", "World").with("count", 7);
//! let builder = TemplateTagsBuilder::new();
//!
//! let result = builder
//!     .parse("Hello ${Name} #${count:[format:000]}", Some(&values), None, true, None)
//!     .unwrap();
//! assert_eq!(result, "Hello World #007");
//! ```
//!
//! ### As a CLI Tool
//!
//! ```bash
//! # Resolve a template with values
//! tagbuilder template.txt --set name=World --set count=(int)7
//!
//! # Process template from stdin with the standard tags
//! echo 'Built in ${Year}' | tagbuilder - --standard-tags
//!
//! # Fall back to a JSON configuration section
//! tagbuilder template.txt --config appsettings.json --section App
//! ```

pub mod coerce;
pub mod config;
pub mod error;
pub mod format;
pub mod grammar;
pub mod random;
pub mod secret;
pub mod standard;
pub mod template;
pub mod value;

// Re-export main types and functions for convenience
pub use config::{ConfigLookup, FnLookup, JsonSection};
pub use error::{Result, TagError};
pub use grammar::{TagGrammar, TagMatch};
pub use secret::{CryptoProvider, IdentityProvider, MaskProvider, Sha256Provider};
pub use standard::{standard_tags, standard_tags_with};
pub use template::{BuilderOptions, ParseOptions, TemplateTagsBuilder, parse};
pub use value::{FormatValue, TagValue, TagValues};
