use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tagbuilder::coerce::parse_literal;
use tagbuilder::secret::{CryptoProvider, IdentityProvider, MaskProvider, Sha256Provider};
use tagbuilder::{ConfigLookup, JsonSection, Result, TagValues, TemplateTagsBuilder};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const LONG_HELP: &str = r#"
Tags:
  ${key}                         - Value of key (case-insensitive, may contain ':' or '.')
  ${key:[format:000]}            - Value rendered with a format string
  ${key=[default:(int)10]}       - Typed default used when key has no value
  ${secret:key}                  - Value passed through the secret provider
  ${randomnumber:[min,max]}      - Random integer in [min, max)
  ${randomstring:[length]}       - Random alphanumeric string
  $${{key}}                      - Escaped tag, emitted as ${key}

Default types:
  int, double, decimal, datetime, date|dateonly, time|timeonly, bool, string

Examples:
  # Resolve a template with a value
  tagbuilder template.txt --set name=World
  # Typed values and standard tags from stdin
  echo 'Built ${Year} v${build:[format:000]}' | tagbuilder - --standard-tags -s build=(int)7
  # Values from JSON, fallbacks from a configuration section
  tagbuilder app.conf.tpl --values values.json --config appsettings.json --section App
  # Fail instead of leaving unresolved tags in place
  tagbuilder template.txt --strict
  # List all tags in template
  tagbuilder template.txt --list=json
  # Save output to file
  tagbuilder template.txt -o output.txt
"#;

/// Resolve ${...} placeholder tags in text.
#[derive(Parser, Debug)]
#[command(
    name = "tagbuilder",
    version,
    about = "Resolve ${...} placeholder tags in text.",
    after_long_help = LONG_HELP
)]
struct Cli {
    /// Template file to process. Use '-' for stdin.
    #[arg(value_name = "TEMPLATE")]
    template: PathBuf,

    /// Set a value (repeatable). The value may carry a type prefix, e.g. count=(int)3
    #[arg(short, long = "set", value_name = "KEY=VALUE", action = clap::ArgAction::Append)]
    set: Vec<String>,

    /// JSON object with values; nested objects become dotted keys
    #[arg(long, value_name = "FILE")]
    values: Option<PathBuf>,

    /// JSON configuration consulted when a key has no value
    #[arg(short, long, value_name = "FILE", env = "TAGBUILDER_CONFIG")]
    config: Option<PathBuf>,

    /// Configuration section to use, e.g. 'App:Settings'
    #[arg(long, value_name = "PATH", requires = "config")]
    section: Option<String>,

    /// Include the standard tags (Year, Now, HostName, ...)
    #[arg(long)]
    standard_tags: bool,

    /// Fail when tags remain unresolved
    #[arg(long)]
    strict: bool,

    /// Keep the case of boolean values (True/False)
    #[arg(long)]
    no_bool_lowering: bool,

    /// Custom regular expression for tags; must capture a 'var' group
    #[arg(long, value_name = "REGEX")]
    pattern: Option<String>,

    /// Maximum number of substitution passes
    #[arg(long, value_name = "N", default_value_t = tagbuilder::template::MAX_ITERATIONS)]
    max_iterations: usize,

    /// How values of secret tags are rendered
    #[arg(long, value_enum, default_value = "plain")]
    secret_mode: SecretMode,

    /// List tags in template (optionally with format: plain, detailed, json)
    #[arg(long, value_name = "FORMAT", num_args = 0..=1, default_missing_value = "plain")]
    list: Option<ListFormat>,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Increase verbosity (can be used multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SecretMode {
    /// Values are emitted as-is after the marker
    Plain,
    /// Every character is replaced by '*'
    Mask,
    /// Hex SHA-256 digest of the value
    Sha256,
}

impl SecretMode {
    fn provider(self) -> &'static dyn CryptoProvider {
        match self {
            SecretMode::Plain => &IdentityProvider,
            SecretMode::Mask => &MaskProvider,
            SecretMode::Sha256 => &Sha256Provider,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq)]
enum ListFormat {
    /// Simple list of tags
    Plain,
    /// Detailed information about each tag
    Detailed,
    /// JSON output for scripting
    Json,
}

#[derive(Serialize)]
struct TagInfo {
    tag: String,
    key: String,
    start: usize,
    end: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    let builder = match build(&cli) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };

    let values = match collect_values(&cli) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };

    let result = read_template(&cli.template).and_then(|template| match cli.list {
        Some(format) => list_tags(&builder, &template, format),
        None => render(&builder, &cli, &template, &values),
    });

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(quiet: bool, verbose: u8) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn build(cli: &Cli) -> Result<TemplateTagsBuilder> {
    let builder = match &cli.pattern {
        Some(pattern) => TemplateTagsBuilder::with_pattern(pattern)?,
        None => TemplateTagsBuilder::new(),
    };

    Ok(builder
        .bool_to_lower(!cli.no_bool_lowering)
        .max_iterations(cli.max_iterations))
}

fn collect_values(cli: &Cli) -> Result<TagValues> {
    let mut values = TagValues::new();

    if let Some(path) = &cli.values {
        info!("Reading values from {}", path.display());
        values.merge(&TagValues::from_json_str(&std::fs::read_to_string(path)?)?);
    }

    for assignment in &cli.set {
        let (key, literal) = assignment.split_once('=').ok_or_else(|| {
            tagbuilder::TagError::InvalidInput {
                message: format!("expected KEY=VALUE, got '{assignment}'"),
            }
        })?;
        values.insert(key.trim(), parse_literal(literal)?);
    }

    if cli.standard_tags {
        values = tagbuilder::standard_tags_with(&values);
    }

    debug!(count = values.len(), "Collected values");
    Ok(values)
}

fn load_config(cli: &Cli) -> Result<Option<JsonSection>> {
    let Some(path) = &cli.config else {
        return Ok(None);
    };

    info!("Reading configuration from {}", path.display());
    let config = JsonSection::from_file(path)?;
    Ok(Some(match &cli.section {
        Some(section) => config.section(section),
        None => config,
    }))
}

fn read_template(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        info!("Reading template from stdin...");
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        info!("Reading template from {}", path.display());
        std::fs::read_to_string(path).map_err(Into::into)
    }
}

fn render(builder: &TemplateTagsBuilder, cli: &Cli, template: &str, values: &TagValues) -> Result<()> {
    let config = load_config(cli)?;
    let processed = builder.parse(
        template,
        Some(values),
        config.as_ref().map(|c| c as &dyn ConfigLookup),
        cli.strict,
        Some(cli.secret_mode.provider()),
    )?;

    if let Some(output_path) = &cli.output {
        info!("Writing output to {}", output_path.display());
        std::fs::write(output_path, processed)?;
    } else {
        print!("{processed}");
        io::stdout().flush()?;
    }

    info!("Processing complete!");
    Ok(())
}

fn list_tags(builder: &TemplateTagsBuilder, template: &str, format: ListFormat) -> Result<()> {
    debug!("Listing template tags...");

    let tags = builder.find_tags(template);

    match format {
        ListFormat::Plain => {
            for tag in &tags {
                println!("{}", tag.raw);
            }
        }
        ListFormat::Detailed => {
            for tag in &tags {
                let clause = tag
                    .extended
                    .as_deref()
                    .map(tagbuilder::grammar::parse_extended)
                    .unwrap_or_default();
                println!("Tag: {}", tag.raw);
                println!("  Key: {}", tag.key);
                println!("  Position: {}..{}", tag.start, tag.end);
                if let Some(format) = &clause.format {
                    println!("  Format: {format}");
                }
                if let Some(default) = &clause.default {
                    println!("  Default: {default}");
                }
                println!();
            }
        }
        ListFormat::Json => {
            let infos: Vec<TagInfo> = tags
                .into_iter()
                .map(|tag| {
                    let clause = tag
                        .extended
                        .as_deref()
                        .map(tagbuilder::grammar::parse_extended)
                        .unwrap_or_default();
                    TagInfo {
                        tag: tag.raw,
                        key: tag.key,
                        start: tag.start,
                        end: tag.end,
                        format: clause.format,
                        default: clause.default,
                    }
                })
                .collect();

            let json = serde_json::to_string_pretty(&infos)?;
            println!("{json}");
        }
    }

    Ok(())
}
