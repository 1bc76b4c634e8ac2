//! Worktrace CLI - Command-line interface for Worktrace
//!
//! Commands:
//! - dates: List the dates an owner has records for
//! - daily: Compute metrics for one owner on one date
//! - summary: Roll metrics up over several dates
//! - seal: Encrypt a field value for fixtures and test exports

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use zeroize::Zeroizing;

use worktrace::config::{WorktraceConfig, DEFAULT_KEY_ENV};
use worktrace::schema::RecordAdapter;
use worktrace::types::{ActivityRecord, AfkPolicy};
use worktrace::{seal_field, ActivityAnalyzer, ComputeError, WORKTRACE_VERSION};

/// Worktrace - Productivity metrics over encrypted activity exports
#[derive(Parser)]
#[command(name = "worktrace")]
#[command(version = WORKTRACE_VERSION)]
#[command(about = "Compute productivity metrics from encrypted activity records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log at debug level (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the dates an owner has records for
    Dates {
        #[command(flatten)]
        source: SourceArgs,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,
    },

    /// Compute metrics for one owner on one date
    Daily {
        #[command(flatten)]
        source: SourceArgs,

        /// Date to aggregate (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,
    },

    /// Roll metrics up over several dates
    Summary {
        #[command(flatten)]
        source: SourceArgs,

        /// Dates to include, in order (defaults to every available date)
        #[arg(short, long = "date")]
        dates: Vec<String>,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,
    },

    /// Encrypt a field value with the configured key
    Seal {
        /// Plaintext value, e.g. "3600" or "true"
        #[arg(long)]
        value: String,

        #[command(flatten)]
        key: KeyArgs,
    },
}

#[derive(Args)]
struct KeyArgs {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base64 key; fields are read verbatim when no key is configured
    #[arg(long, env = DEFAULT_KEY_ENV, hide_env_values = true)]
    key: Option<Zeroizing<String>>,
}

#[derive(Args)]
struct SourceArgs {
    /// Input file path (use - for stdin); defaults to the configured data file
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Owner whose records are analyzed
    #[arg(long)]
    owner: Option<String>,

    #[command(flatten)]
    key: KeyArgs,

    /// Input format
    #[arg(long, default_value = "json")]
    input_format: InputFormat,

    /// Reject AFK values other than true/false/1/0
    #[arg(long)]
    strict_afk: bool,

    /// Aggregate summary dates on worker threads
    #[arg(long)]
    parallel: bool,
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// JSON array of activity rows
    Json,
    /// Newline-delimited JSON (one row per line)
    Ndjson,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let error = serde_json::to_string(&CliError::from(e))
                .unwrap_or_else(|_| "Unknown error".to_string());
            eprintln!("{}", error);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install logger: {}", e);
    }
}

fn run(cli: Cli) -> Result<(), WorktraceCliError> {
    match cli.command {
        Commands::Dates {
            source,
            output_format,
        } => cmd_dates(&source, &output_format),

        Commands::Daily {
            source,
            date,
            output_format,
        } => cmd_daily(&source, &date, &output_format),

        Commands::Summary {
            source,
            dates,
            output_format,
        } => cmd_summary(&source, &dates, &output_format),

        Commands::Seal { value, key } => cmd_seal(&value, &key),
    }
}

fn cmd_dates(source: &SourceArgs, output_format: &OutputFormat) -> Result<(), WorktraceCliError> {
    let (analyzer, records) = load_source(source)?;
    let dates = analyzer.available_dates(&records);
    print!("{}", format_output(&dates, output_format)?);
    Ok(())
}

fn cmd_daily(
    source: &SourceArgs,
    date: &str,
    output_format: &OutputFormat,
) -> Result<(), WorktraceCliError> {
    let date = parse_date(date)?;
    let (analyzer, records) = load_source(source)?;
    let metrics = analyzer.daily(&records, date)?;
    print!("{}", format_output(&metrics, output_format)?);
    Ok(())
}

fn cmd_summary(
    source: &SourceArgs,
    dates: &[String],
    output_format: &OutputFormat,
) -> Result<(), WorktraceCliError> {
    let dates = dates
        .iter()
        .map(|d| parse_date(d))
        .collect::<Result<Vec<_>, _>>()?;
    let (analyzer, records) = load_source(source)?;

    let rollup = if dates.is_empty() {
        analyzer.rollup_all(&records)?
    } else {
        analyzer.rollup(&records, &dates)?
    };
    print!("{}", format_output(&rollup, output_format)?);
    Ok(())
}

fn cmd_seal(value: &str, key_args: &KeyArgs) -> Result<(), WorktraceCliError> {
    let config = load_config(key_args)?;
    let key = config.resolve_key()?.ok_or(WorktraceCliError::NoKey)?;
    println!("{}", seal_field(value, &key)?.as_str());
    Ok(())
}

/// Load configuration and apply the key flag on top of it
fn load_config(key_args: &KeyArgs) -> Result<WorktraceConfig, WorktraceCliError> {
    let mut config = match &key_args.config {
        Some(path) => WorktraceConfig::load(path)?,
        None => WorktraceConfig::default(),
    };
    if let Some(key) = &key_args.key {
        config.key = Some(key.clone());
    }
    Ok(config)
}

/// Build the analyzer from config plus flags, then read the input records
fn load_source(
    source: &SourceArgs,
) -> Result<(ActivityAnalyzer, Vec<ActivityRecord>), WorktraceCliError> {
    let mut config = load_config(&source.key)?;
    if let Some(owner) = &source.owner {
        config.owner_id = Some(owner.clone());
    }
    if config.owner_id.is_none() {
        return Err(WorktraceCliError::MissingArgument("owner"));
    }
    if source.strict_afk {
        config.afk_policy = AfkPolicy::Strict;
    }
    if source.parallel {
        config.parallel = true;
    }

    let input = source
        .input
        .clone()
        .or_else(|| config.data_file.clone())
        .ok_or(WorktraceCliError::MissingArgument("input"))?;

    let analyzer = ActivityAnalyzer::from_config(&config)?;
    if !analyzer.has_key() {
        warn!("no key configured; field values are read as plaintext");
    }

    let records = read_records(&input, &source.input_format)?;
    debug!(records = records.len(), input = %input.display(), "loaded activity records");
    Ok((analyzer, records))
}

fn read_records(
    input: &Path,
    input_format: &InputFormat,
) -> Result<Vec<ActivityRecord>, WorktraceCliError> {
    let input_data = if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            warn!("reading records from terminal stdin; end input with Ctrl-D");
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let rows = match input_format {
        InputFormat::Json => RecordAdapter::parse_array(&input_data)?,
        InputFormat::Ndjson => RecordAdapter::parse_ndjson(&input_data)?,
    };

    Ok(RecordAdapter::to_records(&rows)?)
}

fn parse_date(text: &str) -> Result<NaiveDate, ComputeError> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|e| ComputeError::DateParseError(format!("{:?}: {}", text, e)))
}

fn format_output<T: Serialize>(
    value: &T,
    format: &OutputFormat,
) -> Result<String, WorktraceCliError> {
    let mut output = match format {
        OutputFormat::Json => serde_json::to_string(value)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(value)?,
    };
    output.push('\n');
    Ok(output)
}

// Error handling

#[derive(Debug)]
enum WorktraceCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    MissingArgument(&'static str),
    NoKey,
}

impl From<io::Error> for WorktraceCliError {
    fn from(e: io::Error) -> Self {
        WorktraceCliError::Io(e)
    }
}

impl From<ComputeError> for WorktraceCliError {
    fn from(e: ComputeError) -> Self {
        WorktraceCliError::Compute(e)
    }
}

impl From<serde_json::Error> for WorktraceCliError {
    fn from(e: serde_json::Error) -> Self {
        WorktraceCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(code: &str, message: String, hint: Option<&str>) -> Self {
        CliError {
            code: code.to_string(),
            message,
            hint: hint.map(str::to_string),
        }
    }
}

impl From<WorktraceCliError> for CliError {
    fn from(e: WorktraceCliError) -> Self {
        match e {
            WorktraceCliError::Io(e) => CliError::new(
                "IO_ERROR",
                e.to_string(),
                Some("Check file paths and permissions"),
            ),
            WorktraceCliError::Json(e) => {
                CliError::new("JSON_ERROR", e.to_string(), Some("Check JSON syntax"))
            }
            WorktraceCliError::MissingArgument(name) => CliError::new(
                "MISSING_ARGUMENT",
                format!("No {} given", name),
                Some("Pass it as a flag or set it in the --config file"),
            ),
            WorktraceCliError::NoKey => CliError::new(
                "NO_KEY",
                "No key configured".to_string(),
                Some("Pass --key or set WORKTRACE_KEY"),
            ),
            WorktraceCliError::Compute(e) => CliError::from(e),
        }
    }
}

impl From<ComputeError> for CliError {
    fn from(e: ComputeError) -> Self {
        let message = e.to_string();
        if e.is_token_failure() {
            return CliError::new(
                "TOKEN_ERROR",
                message,
                Some("Check that the key matches the one the export was sealed with"),
            );
        }

        match e {
            ComputeError::NoDataForDate { .. } => CliError::new(
                "NO_DATA",
                message,
                Some("Run 'worktrace dates' to list available dates"),
            ),
            ComputeError::InvalidDurationValue(_) | ComputeError::InvalidAfkFlag(_) => {
                CliError::new(
                    "INVALID_VALUE",
                    message,
                    Some("A decrypted field did not hold a duration or AFK flag"),
                )
            }
            ComputeError::InvalidKey(_) => CliError::new(
                "INVALID_KEY",
                message,
                Some("Keys are 32 bytes encoded as base64"),
            ),
            ComputeError::DateParseError(_) => {
                CliError::new("INVALID_DATE", message, Some("Use the YYYY-MM-DD format"))
            }
            ComputeError::ConfigError(_) => {
                CliError::new("CONFIG_ERROR", message, Some("Check the configuration file"))
            }
            _ => CliError::new(
                "PARSE_ERROR",
                message,
                Some("Ensure rows carry employee_id, start_time, duration_seconds and is_afk"),
            ),
        }
    }
}
