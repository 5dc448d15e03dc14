//! CLI entry point for the curation pipeline.

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use dotenv::dotenv;
use lex_curation::{
    CurationConfig, CurationOutcome, CurationPipeline, CuratorInfo, ExportFormat,
    NormalizationMethod, OutlierMethod, SeverityPolicy,
};
use std::path::PathBuf;
use tracing::{error, info};

/// CLI-compatible outlier method enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutlierMethod {
    /// Tukey fences at Q1 - k*IQR and Q3 + k*IQR
    Iqr,
    /// Mean +/- k sample standard deviations
    Zscore,
}

impl From<CliOutlierMethod> for OutlierMethod {
    fn from(cli: CliOutlierMethod) -> Self {
        match cli {
            CliOutlierMethod::Iqr => OutlierMethod::Iqr,
            CliOutlierMethod::Zscore => OutlierMethod::Zscore,
        }
    }
}

/// CLI-compatible normalization enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliNormalization {
    /// Zero mean, unit population variance
    Standard,
    /// Rescale to [0, 1]
    Minmax,
    /// Center on the median, scale by the IQR
    Robust,
}

impl From<CliNormalization> for NormalizationMethod {
    fn from(cli: CliNormalization) -> Self {
        match cli {
            CliNormalization::Standard => NormalizationMethod::Standard,
            CliNormalization::Minmax => NormalizationMethod::MinMax,
            CliNormalization::Robust => NormalizationMethod::Robust,
        }
    }
}

/// CLI-compatible dataset export format enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliExportFormat {
    Csv,
    Json,
    Parquet,
}

impl From<CliExportFormat> for ExportFormat {
    fn from(cli: CliExportFormat) -> Self {
        match cli {
            CliExportFormat::Csv => ExportFormat::Csv,
            CliExportFormat::Json => ExportFormat::Json,
            CliExportFormat::Parquet => ExportFormat::Parquet,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "Reproducible dataset curation pipeline",
    long_about = "Validates a tabular dataset against its schema, flags outliers, \
                  normalizes and derives features, exports checksummed artifacts and \
                  writes a provenance record.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  LEX_CURATOR_NAME          Curator name recorded in provenance\n  \
                  LEX_CURATOR_INSTITUTION   Curator institution\n  \
                  LEX_CURATOR_CONTACT       Curator contact\n\n\
                  EXAMPLES:\n  \
                  # Curate with defaults\n  \
                  lex-curation data/ai4i2020.csv\n\n  \
                  # Z-score outliers with robust scaling, CSV only\n  \
                  lex-curation data/ai4i2020.csv --outlier-method zscore --threshold 3 \\\n    \
                  --normalization robust --formats csv\n\n  \
                  # Machine-readable result\n  \
                  lex-curation data/ai4i2020.csv --json | jq .artifacts"
)]
struct Args {
    /// Path to the CSV dataset to curate
    input: PathBuf,

    /// Output directory for artifacts, logs and provenance
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Base name (without extension) of the curated dataset files
    #[arg(long)]
    dataset_name: Option<String>,

    /// JSON configuration file; command-line flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Outlier detection method
    #[arg(long, value_enum)]
    outlier_method: Option<CliOutlierMethod>,

    /// Outlier threshold (IQR multiplier or z-score cut-off)
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Normalization method for the continuous features
    #[arg(short, long, value_enum)]
    normalization: Option<CliNormalization>,

    /// Dataset formats to export (comma separated)
    #[arg(short, long, value_enum, value_delimiter = ',')]
    formats: Vec<CliExportFormat>,

    /// Curator name recorded in the provenance record
    #[arg(long, env = "LEX_CURATOR_NAME")]
    curator_name: Option<String>,

    /// Curator institution
    #[arg(long, env = "LEX_CURATOR_INSTITUTION", default_value = "")]
    curator_institution: String,

    /// Curator contact
    #[arg(long, env = "LEX_CURATOR_CONTACT")]
    curator_contact: Option<String>,

    /// Treat every validation finding as fatal
    #[arg(long)]
    strict: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all progress logs; only outputs the final JSON outcome.
    #[arg(long)]
    json: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Resolve the effective configuration: file (or defaults) overlaid with flags.
fn build_config(args: &Args) -> Result<CurationConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            CurationConfig::from_json_file(path)?
        }
        None => CurationConfig::default(),
    };

    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(name) = &args.dataset_name {
        config.dataset_name = name.clone();
    }
    if let Some(method) = args.outlier_method {
        config.outlier_method = method.into();
    }
    if let Some(threshold) = args.threshold {
        config.outlier_threshold = threshold;
    }
    if let Some(method) = args.normalization {
        config.normalization = method.into();
    }
    if !args.formats.is_empty() {
        config.export_formats = args.formats.iter().map(|f| (*f).into()).collect();
    }
    if let Some(name) = &args.curator_name {
        let mut curator = CuratorInfo::new(name, &args.curator_institution);
        if let Some(contact) = &args.curator_contact {
            curator = curator.with_contact(contact);
        }
        config.curator = Some(curator);
    }
    if args.strict {
        config.severity = SeverityPolicy::strict();
    }

    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    // Load environment variables from .env file before clap reads env fallbacks
    dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    let config = build_config(&args)?;

    let show_progress = !args.quiet && !args.json;
    let pipeline = CurationPipeline::builder()
        .config(config)
        .on_progress(move |update| {
            if show_progress {
                info!(
                    "[{:>3.0}%] {}: {}",
                    update.progress * 100.0,
                    update.stage.display_name(),
                    update.message
                );
            }
        })
        .build()?;

    info!("{}", "=".repeat(80));
    info!("Starting curation of {}", args.input.display());
    info!("{}", "=".repeat(80));

    match pipeline.run(&args.input) {
        Ok(outcome) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_human_readable_summary(&outcome);
            }
            Ok(())
        }
        Err(e) => {
            error!("Curation failed [{}]: {}", e.error_code(), e);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&e)?);
            }
            Err(anyhow!("Curation failed: {}", e))
        }
    }
}

/// Print the end-of-run summary.
///
/// Uses `println!` intentionally: this is the primary CLI output and must be
/// visible regardless of log level.
fn print_human_readable_summary(outcome: &CurationOutcome) {
    println!("\n{}", "=".repeat(80));
    println!("CURATION COMPLETE");
    println!("{}\n", "=".repeat(80));

    println!("DATASET");
    println!("{}", "-".repeat(40));
    println!("  Input: {}", outcome.input.display());
    println!("  Rows: {}", outcome.rows);
    println!("  Columns: {}", outcome.columns);
    println!("  Validation: {}", outcome.validation.overall_status());
    println!(
        "  Outliers flagged: {} ({} method, threshold {})",
        outcome.outliers.total_flagged(),
        outcome.outliers.method,
        outcome.outliers.threshold
    );
    println!("  Normalization: {}", outcome.scaling.method);
    println!();

    println!("ARTIFACTS");
    println!("{}", "-".repeat(40));
    for artifact in &outcome.artifacts {
        println!(
            "  {:<40} {:>10.3} MB  sha256:{}",
            artifact.filename,
            artifact.size_mb(),
            artifact.checksum_sha256
        );
    }
    println!();

    println!("RECORDS");
    println!("{}", "-".repeat(40));
    println!("  {}", outcome.transformation_log.display());
    println!("  {}", outcome.export_log.display());
    println!("  {}", outcome.provenance_record.display());
    println!("  {}", outcome.provenance_summary.display());
    println!();

    if !outcome.warnings.is_empty() {
        println!("WARNINGS");
        println!("{}", "-".repeat(40));
        for warning in &outcome.warnings {
            println!("  - {}", warning);
        }
        println!();
    }

    println!("{}", "=".repeat(80));
    println!("Completed in {} ms", outcome.duration_ms);
    println!("{}", "=".repeat(80));
}
