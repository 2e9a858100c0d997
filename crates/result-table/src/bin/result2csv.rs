use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand, ValueEnum};
use result_table::{
    HeaderMode, PageSelection, QualityMode, ReconstructOptions, ReconstructOutcome, RowGrouping,
    TableArea, reconstruct_table, write_outcome_csv,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "result2csv",
    version,
    about = "Rebuild result-sheet tables from text PDFs"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Reconstruct the result table and write it as CSV or JSON.
    Extract(ExtractArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

#[derive(Debug, Args)]
struct ExtractArgs {
    /// Input PDF path.
    #[arg(short, long)]
    input: PathBuf,

    /// Output path.
    #[arg(short, long)]
    output: PathBuf,

    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// Page selection like 1-3,5.
    #[arg(long)]
    pages: Option<String>,

    /// Table area in format page:x1,y1,x2,y2 (top-left origin). Repeatable.
    #[arg(long = "area")]
    areas: Vec<String>,

    /// Output delimiter character for CSV.
    #[arg(long, default_value = ",")]
    delimiter: char,

    /// Header handling: auto, first or none.
    #[arg(long, default_value = "auto")]
    header: String,

    /// Row grouping: greedy or sorted.
    #[arg(long, default_value = "greedy")]
    grouping: String,

    /// Quality mode: best-effort, strict or skip-ambiguous.
    #[arg(long, default_value = "best-effort")]
    quality: String,

    /// Vertical distance, in points, under which fragments share a row.
    #[arg(long)]
    row_tolerance: Option<f64>,

    /// Horizontal distance, in points, under which x positions share a column.
    #[arg(long)]
    column_tolerance: Option<f64>,

    /// Minimum cells per line for the text-line fallback.
    #[arg(long, default_value_t = 2)]
    min_cols: usize,

    /// Keep certificate titles and other boilerplate rows.
    #[arg(long)]
    keep_boilerplate: bool,

    /// Skip relabelling and remapping of exam-result tables.
    #[arg(long)]
    no_restructure: bool,

    /// Print every issue recorded during reconstruction.
    #[arg(short, long)]
    verbose: bool,
}

fn parse_options(args: &ExtractArgs) -> Result<ReconstructOptions> {
    let pages = args
        .pages
        .as_deref()
        .map(PageSelection::from_str)
        .transpose()
        .map_err(|error| anyhow!("invalid page selection: {error}"))
        .context("failed to parse --pages")?;

    let areas = args
        .areas
        .iter()
        .map(|value| {
            TableArea::from_str(value)
                .map_err(|error| anyhow!("invalid table area: {error}"))
                .with_context(|| format!("failed to parse --area '{value}'"))
        })
        .collect::<Result<Vec<_>>>()?;

    let header_mode = HeaderMode::from_str(&args.header).map_err(|error| anyhow!(error))?;
    let row_grouping = RowGrouping::from_str(&args.grouping).map_err(|error| anyhow!(error))?;
    let quality_mode = QualityMode::from_str(&args.quality).map_err(|error| anyhow!(error))?;

    let defaults = ReconstructOptions::default();
    Ok(ReconstructOptions {
        pages,
        areas,
        row_tolerance: args.row_tolerance.unwrap_or(defaults.row_tolerance),
        column_tolerance: args.column_tolerance.unwrap_or(defaults.column_tolerance),
        row_grouping,
        header_mode,
        quality_mode,
        min_cols: args.min_cols,
        filter_boilerplate: !args.keep_boilerplate,
        restructure_results: !args.no_restructure,
        ..defaults
    })
}

fn log_outcome(outcome: &ReconstructOutcome, verbose: bool) {
    for error in &outcome.metadata.errors {
        eprintln!("error: {error}");
    }
    if outcome.metadata.issues.is_empty() {
        return;
    }

    eprintln!(
        "warning: {} issue(s) detected (confidence {:.2})",
        outcome.metadata.issues.len(),
        outcome.metadata.confidence
    );
    if verbose {
        for issue in &outcome.metadata.issues {
            eprintln!("  - {issue}");
        }
    }
}

fn run_extract(args: &ExtractArgs) -> Result<ReconstructOutcome> {
    let options = parse_options(args)?;
    if !args.delimiter.is_ascii() {
        anyhow::bail!("delimiter must be a single ASCII character");
    }

    let pdf = std::fs::read(&args.input)
        .with_context(|| format!("failed to read '{}'", args.input.display()))?;
    let outcome = reconstruct_table(&pdf, &options)
        .with_context(|| format!("failed to reconstruct table from '{}'", args.input.display()))?;

    match args.format {
        OutputFormat::Csv => write_outcome_csv(&args.output, &outcome, args.delimiter as u8)
            .with_context(|| format!("failed to write '{}'", args.output.display()))?,
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&outcome)?;
            std::fs::write(&args.output, json)
                .with_context(|| format!("failed to write '{}'", args.output.display()))?;
        }
    }

    Ok(outcome)
}

fn main() -> ExitCode {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("result_table=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Extract(args) => match run_extract(&args) {
            Ok(outcome) => {
                log_outcome(&outcome, args.verbose);
                if outcome.success {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::from(2)
                }
            }
            Err(error) => {
                eprintln!("error: {error:#}");
                ExitCode::from(1)
            }
        },
    }
}
