//! Timeline CLI - Command-line interface for Timeline Flux
//!
//! Commands:
//! - run: Export → CSV tables → animated HTML map
//! - normalize: Export → CSV tables
//! - render: CSV tables → animated HTML map
//! - validate: Report per-record problems in an export

use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use timeline_flux::pipeline::{RenderSummary, TimelineProcessor};
use timeline_flux::schema::RawRecordAdapter;
use timeline_flux::{TimelineConfig, TimelineError, FLUX_VERSION};

/// Timeline - Animated time-lapse maps from location history
#[derive(Parser)]
#[command(name = "timeline")]
#[command(version = FLUX_VERSION)]
#[command(about = "Turn a location-history export into an animated map", long_about = None)]
struct Cli {
    /// JSON config file (defaults apply to anything it leaves out)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug detail to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Seed for the category color draw
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline
    Run {
        /// Location-history export (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Visits CSV path
        #[arg(long)]
        visits: Option<PathBuf>,

        /// Activities CSV path
        #[arg(long)]
        activities: Option<PathBuf>,

        /// HTML output path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Normalize an export into the visits and activities tables
    Normalize {
        /// Location-history export (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Visits CSV path
        #[arg(long)]
        visits: Option<PathBuf>,

        /// Activities CSV path
        #[arg(long)]
        activities: Option<PathBuf>,
    },

    /// Render the visits and activities tables into the HTML map
    Render {
        /// Visits CSV path
        #[arg(long)]
        visits: Option<PathBuf>,

        /// Activities CSV path
        #[arg(long)]
        activities: Option<PathBuf>,

        /// HTML output path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate an export without producing anything
    Validate {
        /// Location-history export (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays clean for reports
fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "timeline_flux=debug,timeline=debug"
    } else {
        "timeline_flux=info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .init();
}

fn run(cli: Cli) -> Result<(), TimelineCliError> {
    let mut config = match &cli.config {
        Some(path) => TimelineConfig::from_json_file(path)?,
        None => TimelineConfig::default(),
    };
    if cli.seed.is_some() {
        config.builder.seed = cli.seed;
    }

    match cli.command {
        Commands::Run {
            input,
            visits,
            activities,
            output,
        } => {
            override_path(&mut config.paths.input, input);
            override_path(&mut config.paths.visits_csv, visits);
            override_path(&mut config.paths.activities_csv, activities);
            override_path(&mut config.paths.output_html, output);
            cmd_run(TimelineProcessor::new(config)?)
        }

        Commands::Normalize {
            input,
            visits,
            activities,
        } => {
            override_path(&mut config.paths.input, input);
            override_path(&mut config.paths.visits_csv, visits);
            override_path(&mut config.paths.activities_csv, activities);
            cmd_normalize(&TimelineProcessor::new(config)?)
        }

        Commands::Render {
            visits,
            activities,
            output,
        } => {
            override_path(&mut config.paths.visits_csv, visits);
            override_path(&mut config.paths.activities_csv, activities);
            override_path(&mut config.paths.output_html, output);
            let summary = TimelineProcessor::new(config)?.render()?;
            print_render(&summary);
            Ok(())
        }

        Commands::Validate { input, json } => {
            override_path(&mut config.paths.input, input);
            cmd_validate(&config.paths.input, json)
        }
    }
}

fn override_path(slot: &mut PathBuf, value: Option<PathBuf>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn read_input(input: &Path) -> Result<String, TimelineCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn cmd_run(processor: TimelineProcessor) -> Result<(), TimelineCliError> {
    cmd_normalize(&processor)?;
    print_render(&processor.render()?);
    Ok(())
}

fn cmd_normalize(processor: &TimelineProcessor) -> Result<(), TimelineCliError> {
    let paths = &processor.config().paths;
    let raw_json = read_input(&paths.input)?;
    let (history, report) = processor.normalize(&raw_json)?;
    processor.write_tables(&history)?;

    println!(
        "Normalized {} records: {} visits, {} activities, {} unrecognized, {} skipped",
        report.total_records,
        report.visits,
        report.activities,
        report.unrecognized,
        report.skipped_malformed
    );
    println!("  visits:     {}", paths.visits_csv.display());
    println!("  activities: {}", paths.activities_csv.display());
    Ok(())
}

fn print_render(summary: &RenderSummary) {
    println!(
        "Rendered {} features ({} categories) centered on [{:.5}, {:.5}]",
        summary.features, summary.categories, summary.center[0], summary.center[1]
    );
    println!("  map: {}", summary.output_html.display());
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), TimelineCliError> {
    let input_data = read_input(input)?;
    let records = RawRecordAdapter::parse(&input_data)?;
    let results = RawRecordAdapter::validate_records(&records);
    let unrecognized_records = RawRecordAdapter::count_unrecognized(&records);

    let report = ValidationReport {
        total_records: records.len(),
        valid_records: records.len() - results.len() - unrecognized_records,
        invalid_records: results.len(),
        unrecognized_records,
        errors: results
            .into_iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                kind: r.kind.to_string(),
                issues: r.issues,
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.valid_records);
        println!("Invalid records: {}", report.invalid_records);
        println!("Unrecognized:    {} (ignored)", report.unrecognized_records);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - Record {} ({}): {}", err.index, err.kind, err.issues.join("; "));
            }
        }
    }

    if report.invalid_records > 0 {
        Err(TimelineCliError::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

// Error types

#[derive(Debug)]
enum TimelineCliError {
    Io(io::Error),
    Pipeline(TimelineError),
    Json(serde_json::Error),
    ValidationFailed(usize),
}

impl From<io::Error> for TimelineCliError {
    fn from(e: io::Error) -> Self {
        TimelineCliError::Io(e)
    }
}

impl From<TimelineError> for TimelineCliError {
    fn from(e: TimelineError) -> Self {
        TimelineCliError::Pipeline(e)
    }
}

impl From<serde_json::Error> for TimelineCliError {
    fn from(e: serde_json::Error) -> Self {
        TimelineCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(code: &str, message: String, hint: &str) -> Self {
        CliError {
            code: code.to_string(),
            message,
            hint: Some(hint.to_string()),
        }
    }
}

impl From<TimelineCliError> for CliError {
    fn from(e: TimelineCliError) -> Self {
        match e {
            TimelineCliError::Io(e) => {
                CliError::new("IO_ERROR", e.to_string(), "Check file paths and permissions")
            }
            TimelineCliError::Json(e) => {
                CliError::new("JSON_ERROR", e.to_string(), "Check JSON syntax")
            }
            TimelineCliError::ValidationFailed(count) => CliError::new(
                "VALIDATION_FAILED",
                format!("{} records failed validation", count),
                "Fix validation errors and retry",
            ),
            TimelineCliError::Pipeline(e) => pipeline_error(e),
        }
    }
}

fn pipeline_error(e: TimelineError) -> CliError {
    let message = e.to_string();
    match e {
        TimelineError::Io(_) => {
            CliError::new("IO_ERROR", message, "Check file paths and permissions")
        }
        TimelineError::JsonError(_) | TimelineError::ParseError(_) => CliError::new(
            "PARSE_ERROR",
            message,
            "Ensure input is a location-history JSON array or NDJSON",
        ),
        TimelineError::MalformedLocation(_) => CliError::new(
            "MALFORMED_LOCATION",
            message,
            "Expected \"Name:lat,lon\"; set normalizer.malformed_location to \"skip_row\" to drop such records",
        ),
        TimelineError::DateParseError(_) | TimelineError::InvalidNumber { .. } => CliError::new(
            "INVALID_RECORD",
            message,
            "Run 'timeline validate' for details",
        ),
        TimelineError::CsvError(_) | TimelineError::MissingColumn(_) => CliError::new(
            "TABLE_ERROR",
            message,
            "Regenerate the tables with 'timeline normalize'",
        ),
        TimelineError::NoVisits => CliError::new(
            "NO_VISITS",
            message,
            "Set builder.zero_visits to \"fallback\" to use builder.fallback_center",
        ),
        TimelineError::PaletteExhausted { .. } => CliError::new(
            "PALETTE_EXHAUSTED",
            message,
            "Add colors to builder.palette or set builder.palette_exhaustion to \"cycle\"",
        ),
        TimelineError::ConfigError(_) => {
            CliError::new("CONFIG_ERROR", message, "Check the config file values")
        }
        TimelineError::EncodingError(_) => {
            CliError::new("ENCODING_ERROR", message, "Report this as a bug")
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    /// Neither a visit nor an activity; skipped by normalization
    unrecognized_records: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    kind: String,
    issues: Vec<String>,
}
