//! Generate one secure identifier per CSV record.
//!
//! Usage:
//!   rowkey <input.csv>
//!   rowkey <input.csv> --no-header --separator ';' -o ids.txt
//!
//! Identifiers are written one per line, in input order.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rowkey_core::{run_path, Mechanism, PersonalizationMode, PipelineConfig, RowKeyError};
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
enum CliError {
    #[error("config error: {0}")]
    Config(#[from] RowKeyError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("logging setup failed: {0}")]
    Logging(String),
    #[error("run stopped after {processed} records: {source}")]
    Incomplete { processed: usize, source: RowKeyError },
}

#[derive(Parser, Debug)]
#[command(name = "rowkey", version, about = "Per-record secure identifiers for CSV files")]
struct Cli {
    /// Input CSV file.
    input: PathBuf,
    /// JSON config file; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Field separator (a space selects the default ',').
    #[arg(long)]
    separator: Option<char>,
    /// Quote character (a space selects the default '"').
    #[arg(long)]
    quote: Option<char>,
    /// Treat the first line as data.
    #[arg(long, default_value_t = false)]
    no_header: bool,
    /// Personalize with the raw line instead of the joined fields.
    #[arg(long, default_value_t = false)]
    raw: bool,
    /// String placed between fields when building the personalization input.
    #[arg(long)]
    join_with: Option<String>,
    /// Use the system CSPRNG without per-record personalization.
    #[arg(long, default_value_t = false)]
    system_rng: bool,
    /// Count lines first to size the result buffer.
    #[arg(long, default_value_t = false)]
    presize: bool,
    /// Output file (default: stdout).
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Print the effective config as JSON and exit.
    #[arg(long, default_value_t = false)]
    print_config: bool,
    /// Log filter when RUST_LOG is unset.
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_logging(&cli.log_level) {
        eprintln!("{}", err);
        return ExitCode::FAILURE;
    }
    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "rowkey failed");
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: &str) -> Result<(), CliError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|err| CliError::Logging(err.to_string()))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| CliError::Logging(err.to_string()))
}

fn build_config(cli: &Cli) -> Result<PipelineConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_path(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(separator) = cli.separator {
        config.separator = separator;
    }
    if let Some(quote) = cli.quote {
        config.quote = quote;
    }
    if cli.no_header {
        config.skip_header = false;
    }
    if cli.raw {
        config.personalization = PersonalizationMode::Raw;
    }
    if let Some(join_with) = &cli.join_with {
        config.join_with = join_with.clone();
    }
    if cli.system_rng {
        config.generator.mechanism = Mechanism::System;
    }
    if cli.presize {
        config.presize = true;
    }
    Ok(config)
}

fn execute(cli: Cli) -> Result<(), CliError> {
    let config = build_config(&cli)?;
    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let report = run_path(&cli.input, &config);
    for diag in &report.diagnostics {
        warn!(line = ?diag.line, "{}", diag.message);
    }

    match &cli.output {
        Some(path) => write_ids(File::create(path)?, &report.identifiers)?,
        None => write_ids(io::stdout().lock(), &report.identifiers)?,
    }
    let target = cli.output.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "stdout".to_string());
    info!(
        input = %cli.input.display(),
        output = %target,
        identifiers = report.identifiers.len(),
        "identifiers written"
    );

    match report.error {
        Some(source) => Err(CliError::Incomplete { processed: report.identifiers.len(), source }),
        None => Ok(()),
    }
}

fn write_ids<W: Write>(out: W, ids: &[String]) -> io::Result<()> {
    let mut writer = BufWriter::new(out);
    for id in ids {
        writeln!(writer, "{}", id)?;
    }
    writer.flush()
}
